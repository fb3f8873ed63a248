// Thu Aug 20 2026 - Alex

pub mod bytes;
pub mod capture;
pub mod error;
pub mod mmap;
pub mod pool;

pub use capture::{CaptureImage, ModuleInfo, RangeMapCapture};
pub use error::MemoryError;
pub use mmap::MappedFile;
pub use pool::BufferPool;
