// Thu Aug 20 2026 - Alex
//
// Endian-parameterized primitive reads over raw scan buffers. Every read is
// bounds-checked and a short buffer is "no value", never a panic: the scan
// loops treat a failed read exactly like a failed validation predicate.

pub fn read_u16(data: &[u8], offset: usize, big_endian: bool) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    let arr = [bytes[0], bytes[1]];
    Some(if big_endian {
        u16::from_be_bytes(arr)
    } else {
        u16::from_le_bytes(arr)
    })
}

pub fn read_u32(data: &[u8], offset: usize, big_endian: bool) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    let arr = [bytes[0], bytes[1], bytes[2], bytes[3]];
    Some(if big_endian {
        u32::from_be_bytes(arr)
    } else {
        u32::from_le_bytes(arr)
    })
}

pub fn read_u64(data: &[u8], offset: usize, big_endian: bool) -> Option<u64> {
    let bytes = data.get(offset..offset + 8)?;
    let arr = [
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ];
    Some(if big_endian {
        u64::from_be_bytes(arr)
    } else {
        u64::from_le_bytes(arr)
    })
}

pub fn read_i32(data: &[u8], offset: usize, big_endian: bool) -> Option<i32> {
    read_u32(data, offset, big_endian).map(|v| v as i32)
}

pub fn read_f32(data: &[u8], offset: usize, big_endian: bool) -> Option<f32> {
    read_u32(data, offset, big_endian).map(f32::from_bits)
}

/// Raw 4-byte tag at `offset`, unswapped. The tag tables carry both byte
/// orders so the caller never needs an endian-flipped read here.
pub fn read_tag(data: &[u8], offset: usize) -> Option<[u8; 4]> {
    let bytes = data.get(offset..offset + 4)?;
    Some([bytes[0], bytes[1], bytes[2], bytes[3]])
}
