// Mon Aug 24 2026 - Alex
//
// Section table recovery for the captured game executable. The image is only
// reachable through the capture's VA resolver, so every field is read through
// resolve + bounds-checked slicing rather than a contiguous-file parser.
// PE header fields are little-endian by format definition, independent of the
// capture's data endianness.

use crate::memory::bytes;
use crate::memory::{CaptureImage, MemoryError};
use bitflags::bitflags;
use log::debug;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u32 {
        const CNT_CODE = 0x0000_0020;
        const CNT_INITIALIZED_DATA = 0x0000_0040;
        const CNT_UNINITIALIZED_DATA = 0x0000_0080;
        const MEM_EXECUTE = 0x2000_0000;
        const MEM_READ = 0x4000_0000;
        const MEM_WRITE = 0x8000_0000;
    }
}

#[derive(Debug, Clone)]
pub struct PeSectionInfo {
    pub index: usize,
    pub name: String,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub characteristics: SectionFlags,
}

impl PeSectionInfo {
    pub fn is_writable_data(&self) -> bool {
        self.characteristics.contains(SectionFlags::MEM_WRITE)
            && self
                .characteristics
                .contains(SectionFlags::CNT_INITIALIZED_DATA)
    }
}

const DOS_MAGIC: u16 = 0x5A4D; // "MZ"
const PE_MAGIC: u32 = 0x0000_4550; // "PE\0\0"
const E_LFANEW_OFFSET: u64 = 0x3C;
const SECTION_DESCRIPTOR_LEN: u64 = 40;
const MAX_SECTIONS: u16 = 96;

/// The .data section on the console build drops its write/initialized flags;
/// it is always the sixth descriptor there, so that index is force-included.
pub const FORCED_DATA_SECTION_INDEX: usize = 5;

fn read_header_bytes<C: CaptureImage>(
    capture: &C,
    va: u64,
    len: usize,
) -> Result<&[u8], MemoryError> {
    capture
        .read_bytes_at(va, len)
        .ok_or(MemoryError::Unresolved(va))
}

/// Enumerate section descriptors of the module at `module_base`.
pub fn parse_sections<C: CaptureImage>(
    capture: &C,
    module_base: u64,
) -> Result<Vec<PeSectionInfo>, MemoryError> {
    let dos = read_header_bytes(capture, module_base, 0x40)?;
    if bytes::read_u16(dos, 0, false) != Some(DOS_MAGIC) {
        return Err(MemoryError::ImageParseError("missing MZ signature".into()));
    }
    let e_lfanew = bytes::read_u32(dos, E_LFANEW_OFFSET as usize, false)
        .ok_or_else(|| MemoryError::ImageParseError("truncated DOS header".into()))? as u64;

    let pe_base = module_base + e_lfanew;
    let pe = read_header_bytes(capture, pe_base, 24)?;
    if bytes::read_u32(pe, 0, false) != Some(PE_MAGIC) {
        return Err(MemoryError::ImageParseError("missing PE signature".into()));
    }
    let section_count = bytes::read_u16(pe, 6, false)
        .ok_or_else(|| MemoryError::ImageParseError("truncated COFF header".into()))?;
    if section_count == 0 || section_count > MAX_SECTIONS {
        return Err(MemoryError::ImageParseError(format!(
            "implausible section count {}",
            section_count
        )));
    }
    let optional_len = bytes::read_u16(pe, 20, false).unwrap_or(0) as u64;
    let table_base = pe_base + 24 + optional_len;

    let mut sections = Vec::with_capacity(section_count as usize);
    for index in 0..section_count as u64 {
        let descriptor_va = table_base + index * SECTION_DESCRIPTOR_LEN;
        let Some(raw) = capture.read_bytes_at(descriptor_va, SECTION_DESCRIPTOR_LEN as usize)
        else {
            // Partial captures can truncate the table mid-descriptor.
            break;
        };
        let name_end = raw[..8].iter().position(|&b| b == 0).unwrap_or(8);
        let name = String::from_utf8_lossy(&raw[..name_end]).into_owned();
        let virtual_size = bytes::read_u32(raw, 8, false).unwrap_or(0);
        let virtual_address = bytes::read_u32(raw, 12, false).unwrap_or(0);
        let characteristics =
            SectionFlags::from_bits_retain(bytes::read_u32(raw, 36, false).unwrap_or(0));
        debug!(
            "section {} {:?} va={:#x} size={:#x} flags={:#x}",
            index,
            name,
            virtual_address,
            virtual_size,
            characteristics.bits()
        );
        sections.push(PeSectionInfo {
            index: index as usize,
            name,
            virtual_address,
            virtual_size,
            characteristics,
        });
    }
    Ok(sections)
}

/// Writable initialized-data sections, plus the force-included index.
pub fn select_data_sections(sections: &[PeSectionInfo]) -> Vec<&PeSectionInfo> {
    sections
        .iter()
        .filter(|s| s.is_writable_data() || s.index == FORCED_DATA_SECTION_INDEX)
        .collect()
}

#[cfg(test)]
pub mod test_image {
    //! Synthetic 32-bit big-endian capture used across the runtime tests.

    pub const IMAGE_BASE: u64 = 0x8200_0000;

    pub fn put_u16_le(image: &mut [u8], offset: usize, value: u16) {
        image[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32_le(image: &mut [u8], offset: usize, value: u32) {
        image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32_be(image: &mut [u8], offset: usize, value: u32) {
        image[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// DOS/PE skeleton with one `.data` section at RVA 0x400, size 0x600.
    pub fn write_pe_skeleton(image: &mut [u8]) {
        image[0] = b'M';
        image[1] = b'Z';
        put_u32_le(image, 0x3C, 0x80);
        image[0x80..0x84].copy_from_slice(b"PE\0\0");
        put_u16_le(image, 0x80 + 6, 1);
        put_u16_le(image, 0x80 + 20, 0xE0);
        let descriptor = 0x80 + 24 + 0xE0;
        image[descriptor..descriptor + 5].copy_from_slice(b".data");
        put_u32_le(image, descriptor + 8, 0x600);
        put_u32_le(image, descriptor + 12, 0x400);
        put_u32_le(image, descriptor + 36, 0xC000_0040);
    }
}
