// Thu Aug 20 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Out of bounds: offset {0} past end of buffer")]
    OutOfBounds(u64),
    #[error("Unresolved virtual address: {0:#x}")]
    Unresolved(u64),
    #[error("Module not found: {0}")]
    ModuleNotFound(String),
    #[error("Image parse error: {0}")]
    ImageParseError(String),
    #[error("Invalid range")]
    InvalidRange,
}
