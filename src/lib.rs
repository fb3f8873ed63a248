// Thu Aug 20 2026 - Alex

#![allow(dead_code)]
#![allow(unused_variables)]
#![allow(ambiguous_glob_reexports)]

pub mod config;
pub mod memory;
pub mod records;
pub mod scan;
pub mod runtime;
pub mod utils;

pub use config::ScanConfig;
pub use memory::{CaptureImage, MappedFile, MemoryError, ModuleInfo, RangeMapCapture};
pub use records::{DetectedMainRecord, GroupHeader, Subrecord, SubrecordKind};
pub use scan::{ScanResult, Scanner};
pub use runtime::{RuntimeIdentifierEntry, RuntimeTableWalker};
