// Fri Aug 21 2026 - Alex

pub mod assets;
pub mod chunked;
pub mod correlate;
pub mod driver;
pub mod result;

pub use assets::AssetStringScanner;
pub use chunked::ChunkedScanner;
pub use driver::Scanner;
pub use result::{AssetPath, ScanCounters, ScanResult};
