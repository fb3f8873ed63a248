// Mon Aug 24 2026 - Alex

pub mod calibrate;
pub mod locate;
pub mod pe;
pub mod walker;

pub use locate::HashTableCandidate;
pub use pe::{PeSectionInfo, SectionFlags};
pub use walker::{RuntimeIdentifierEntry, RuntimeTableWalker};
