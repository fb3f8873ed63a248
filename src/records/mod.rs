// Thu Aug 20 2026 - Alex

pub mod formid;
pub mod header;
pub mod subrecord;
pub mod tags;

pub use formid::{is_valid_formid, is_valid_referenced_formid};
pub use header::{DetectedMainRecord, GroupHeader, MAIN_HEADER_LEN};
pub use subrecord::{Subrecord, SubrecordKind};
