// Thu Aug 20 2026 - Alex

use crate::memory::MemoryError;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default chunk geometry for streaming scans over multi-gigabyte captures.
/// The 1 KiB overlap is enough to re-see any record header or subrecord that
/// straddles a window boundary; duplicates are folded out by the absolute
/// offset seen-sets in the scan result.
pub const CHUNK_SIZE: usize = 16 * 1024 * 1024;
pub const CHUNK_OVERLAP: usize = 1024;

pub struct MappedFile {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl MappedFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MemoryError> {
        let file = File::open(path.as_ref()).map_err(MemoryError::Io)?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(MemoryError::Io)?;
        Ok(Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_slice(&self) -> &[u8] {
        self.mmap.as_ref()
    }

    /// Copy `[offset, offset+len)` into `dest`, returning the number of bytes
    /// actually available. A tail read shorter than `dest` is normal for the
    /// final chunk.
    pub fn read_into(&self, offset: u64, dest: &mut [u8]) -> Result<usize, MemoryError> {
        let total = self.mmap.len() as u64;
        if offset >= total {
            return Err(MemoryError::OutOfBounds(offset));
        }
        let avail = ((total - offset) as usize).min(dest.len());
        let start = offset as usize;
        dest[..avail].copy_from_slice(&self.mmap[start..start + avail]);
        Ok(avail)
    }
}
