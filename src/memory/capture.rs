// Fri Aug 21 2026 - Alex

use crate::memory::bytes;

/// One loaded module recorded in the capture's metadata stream.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub base_address: u64,
    pub size: u64,
}

impl ModuleInfo {
    pub fn contains(&self, va: u64) -> bool {
        va >= self.base_address && va < self.base_address + self.size
    }
}

/// Read-only view of a captured process image. The container format (minidump
/// streams etc.) is parsed by the caller; the core only needs the raw bytes,
/// the module list, and the virtual-address-to-file-offset map.
///
/// Every pointer recovered from the capture is a virtual address that must go
/// through `resolve` before any dereference. A `None` from `resolve` means the
/// page was not captured; callers skip that entry and keep going.
pub trait CaptureImage {
    fn data(&self) -> &[u8];
    fn modules(&self) -> &[ModuleInfo];
    fn resolve(&self, va: u64) -> Option<u64>;
    fn big_endian(&self) -> bool;

    /// Pointer width of the captured process, in bytes. Every supported
    /// title ships a 32-bit process on both platforms; values are normalized
    /// to u64 on read.
    fn pointer_width(&self) -> usize {
        4
    }

    fn find_module(&self, name_fragment: &str) -> Option<&ModuleInfo> {
        let needle = name_fragment.to_ascii_lowercase();
        self.modules()
            .iter()
            .find(|m| m.name.to_ascii_lowercase().contains(&needle))
    }

    fn read_bytes_at(&self, va: u64, len: usize) -> Option<&[u8]> {
        let offset = self.resolve(va)? as usize;
        self.data().get(offset..offset.checked_add(len)?)
    }

    fn read_u16_at(&self, va: u64) -> Option<u16> {
        let offset = self.resolve(va)? as usize;
        bytes::read_u16(self.data(), offset, self.big_endian())
    }

    fn read_u32_at(&self, va: u64) -> Option<u32> {
        let offset = self.resolve(va)? as usize;
        bytes::read_u32(self.data(), offset, self.big_endian())
    }

    /// Pointer-sized read, normalized to u64.
    fn read_ptr_at(&self, va: u64) -> Option<u64> {
        let offset = self.resolve(va)? as usize;
        if self.pointer_width() == 4 {
            bytes::read_u32(self.data(), offset, self.big_endian()).map(u64::from)
        } else {
            bytes::read_u64(self.data(), offset, self.big_endian())
        }
    }

    /// NUL-terminated string at `va`, capped at `max_len` decoded bytes.
    /// Returns `None` when the address is unmapped or no terminator shows up
    /// within the cap.
    fn read_c_string_at(&self, va: u64, max_len: usize) -> Option<String> {
        let offset = self.resolve(va)? as usize;
        let data = self.data();
        let end = data.len().min(offset + max_len);
        let window = data.get(offset..end)?;
        let nul = window.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&window[..nul]).ok().map(str::to_string)
    }
}

/// Capture view assembled from pre-parsed (virtual address, file offset, len)
/// ranges. This is what the minidump-reading collaborator hands the core, and
/// what the walker tests build synthetically.
pub struct RangeMapCapture<'a> {
    data: &'a [u8],
    ranges: Vec<(u64, u64, u64)>,
    modules: Vec<ModuleInfo>,
    big_endian: bool,
}

impl<'a> RangeMapCapture<'a> {
    pub fn new(data: &'a [u8], big_endian: bool) -> Self {
        Self {
            data,
            ranges: Vec::new(),
            modules: Vec::new(),
            big_endian,
        }
    }

    pub fn add_range(&mut self, va: u64, file_offset: u64, len: u64) {
        self.ranges.push((va, file_offset, len));
        self.ranges.sort_by_key(|r| r.0);
    }

    pub fn add_module(&mut self, module: ModuleInfo) {
        self.modules.push(module);
    }

    pub fn ranges(&self) -> &[(u64, u64, u64)] {
        &self.ranges
    }
}

impl<'a> CaptureImage for RangeMapCapture<'a> {
    fn data(&self) -> &[u8] {
        self.data
    }

    fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    fn resolve(&self, va: u64) -> Option<u64> {
        if va == 0 {
            return None;
        }
        for &(start, file_offset, len) in &self.ranges {
            if va >= start && va < start + len {
                let offset = file_offset + (va - start);
                if offset < self.data.len() as u64 {
                    return Some(offset);
                }
                return None;
            }
        }
        None
    }

    fn big_endian(&self) -> bool {
        self.big_endian
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_and_reads() {
        let data = [0u8, 0, 0xDE, 0xAD, 0xBE, 0xEF, b'H', b'i', 0, 0xFF];
        let mut capture = RangeMapCapture::new(&data, true);
        capture.add_range(0x8200_0000, 2, 8);

        assert_eq!(capture.resolve(0x8200_0000), Some(2));
        assert_eq!(capture.resolve(0x8200_0007), Some(9));
        assert_eq!(capture.resolve(0x8200_0008), None);
        assert_eq!(capture.resolve(0), None);
        assert_eq!(capture.read_u32_at(0x8200_0000), Some(0xDEADBEEF));
        assert_eq!(capture.read_ptr_at(0x8200_0000), Some(0xDEADBEEF));
        assert_eq!(
            capture.read_c_string_at(0x8200_0004, 16),
            Some("Hi".to_string())
        );
    }

    #[test]
    fn test_find_module() {
        let data = [0u8; 4];
        let mut capture = RangeMapCapture::new(&data, true);
        capture.add_module(ModuleInfo {
            name: "D:\\Game\\FalloutNV.exe".to_string(),
            base_address: 0x8200_0000,
            size: 0x100_0000,
        });
        assert!(capture.find_module("falloutnv").is_some());
        assert!(capture.find_module("skyrim").is_none());
        assert!(capture.modules()[0].contains(0x8200_0010));
    }
}
