// Thu Aug 20 2026 - Alex

pub mod logging;
pub mod strings;
