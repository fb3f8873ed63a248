// Fri Aug 21 2026 - Alex

use crate::records::{DetectedMainRecord, GroupHeader, Subrecord, SubrecordKind};
use crate::runtime::RuntimeIdentifierEntry;
use crate::utils::strings;
use ahash::AHashSet;
use indexmap::IndexMap;
use serde::Serialize;

/// Asset category derived from the file extension of a recovered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssetCategory {
    Model,
    Texture,
    Sound,
    Animation,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetPath {
    pub path: String,
    pub category: AssetCategory,
    pub offset: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanCounters {
    pub bytes_scanned: u64,
    pub chunks_scanned: u64,
    pub sections_scanned: u64,
    pub chains_walked: u64,
    pub chain_errors: u64,
}

/// The scan aggregate. Append-only for the lifetime of a scan: the driver
/// fills the record/subrecord lists, then the correlator and the runtime
/// walker enrich it with name mappings. Nothing is ever removed.
#[derive(Serialize)]
pub struct ScanResult {
    pub main_records: Vec<DetectedMainRecord>,
    pub groups: Vec<GroupHeader>,
    pub subrecords: IndexMap<SubrecordKind, Vec<Subrecord>>,
    /// FormID -> editor ID, from backward correlation and the runtime walker.
    pub editor_ids: IndexMap<u32, String>,
    /// Identifiers following the f/i/s/b game-setting prefix convention.
    pub setting_names: Vec<String>,
    pub asset_paths: Vec<AssetPath>,
    /// Free-standing dialogue-looking strings from the asset/dialogue pass.
    pub dialogue_lines: Vec<String>,
    pub runtime_entries: Vec<RuntimeIdentifierEntry>,
    pub counters: ScanCounters,

    #[serde(skip)]
    seen_record_offsets: AHashSet<u64>,
    #[serde(skip)]
    seen_identifiers: AHashSet<String>,
    #[serde(skip)]
    seen_ref_formids: AHashSet<u32>,
    #[serde(skip)]
    seen_asset_paths: AHashSet<String>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self {
            main_records: Vec::new(),
            groups: Vec::new(),
            subrecords: IndexMap::new(),
            editor_ids: IndexMap::new(),
            setting_names: Vec::new(),
            asset_paths: Vec::new(),
            dialogue_lines: Vec::new(),
            runtime_entries: Vec::new(),
            counters: ScanCounters::default(),
            seen_record_offsets: AHashSet::new(),
            seen_identifiers: AHashSet::new(),
            seen_ref_formids: AHashSet::new(),
            seen_asset_paths: AHashSet::new(),
        }
    }

    /// Case-insensitive dedup on the cleaned path; `limit` is the hard cap on
    /// accepted entries. Returns whether the path was recorded.
    pub fn add_asset_path(&mut self, path: AssetPath, limit: usize) -> bool {
        if self.asset_paths.len() >= limit {
            return false;
        }
        if !self.seen_asset_paths.insert(path.path.clone()) {
            return false;
        }
        self.asset_paths.push(path);
        true
    }

    /// Deduplicated by absolute offset so the chunk-overlap re-scan cannot
    /// double-count a record. Returns whether the record was new.
    pub fn add_main_record(&mut self, record: DetectedMainRecord) -> bool {
        if !self.seen_record_offsets.insert(record.offset) {
            return false;
        }
        self.main_records.push(record);
        true
    }

    pub fn add_group(&mut self, group: GroupHeader) -> bool {
        if !self.seen_record_offsets.insert(group.offset) {
            return false;
        }
        self.groups.push(group);
        true
    }

    pub fn add_subrecord(&mut self, sub: Subrecord) -> bool {
        match &sub {
            Subrecord::Identifier { text, .. } => {
                if !self.seen_identifiers.insert(text.clone()) {
                    return false;
                }
                if strings::is_setting_name(text) {
                    self.setting_names.push(text.clone());
                }
            }
            Subrecord::FormIdRef { form_id, .. } => {
                if !self.seen_ref_formids.insert(*form_id) {
                    return false;
                }
            }
            _ => {}
        }
        self.subrecords.entry(sub.kind()).or_default().push(sub);
        true
    }

    pub fn subrecords_of(&self, kind: SubrecordKind) -> &[Subrecord] {
        self.subrecords
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.main_records.len()
    }

    pub fn subrecord_count(&self) -> usize {
        self.subrecords.values().map(Vec::len).sum()
    }

    /// FormIDs of scanned main records of one type, used by the runtime
    /// walker's sibling-table calibration.
    pub fn formids_for_tag(&self, tag: &str) -> AHashSet<u32> {
        self.main_records
            .iter()
            .filter(|r| r.tag == tag)
            .map(|r| r.form_id)
            .collect()
    }

    pub fn set_editor_id(&mut self, form_id: u32, name: &str) {
        self.editor_ids
            .entry(form_id)
            .or_insert_with(|| name.to_string());
    }
}

impl Default for ScanResult {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(offset: u64) -> DetectedMainRecord {
        DetectedMainRecord {
            tag: "GMST".to_string(),
            body_size: 10,
            flags: 0,
            form_id: 0x123,
            offset,
            big_endian: false,
        }
    }

    #[test]
    fn test_offset_dedup() {
        let mut result = ScanResult::new();
        assert!(result.add_main_record(record_at(100)));
        assert!(!result.add_main_record(record_at(100)));
        assert!(result.add_main_record(record_at(200)));
        assert_eq!(result.record_count(), 2);
    }

    #[test]
    fn test_identifier_dedup_and_setting_classification() {
        let mut result = ScanResult::new();
        let ident = Subrecord::Identifier {
            text: "fGravity".to_string(),
            offset: 10,
            length: 9,
        };
        assert!(result.add_subrecord(ident.clone()));
        assert!(!result.add_subrecord(ident));
        assert_eq!(result.subrecords_of(SubrecordKind::Identifier).len(), 1);
        assert_eq!(result.setting_names, vec!["fGravity".to_string()]);
    }

    #[test]
    fn test_formid_ref_dedup() {
        let mut result = ScanResult::new();
        let make = |offset| Subrecord::FormIdRef {
            tag: "SCRO".to_string(),
            form_id: 0x0100_0042,
            offset,
            big_endian: false,
        };
        assert!(result.add_subrecord(make(0)));
        assert!(!result.add_subrecord(make(64)));
    }

    #[test]
    fn test_formids_for_tag() {
        let mut result = ScanResult::new();
        result.add_main_record(record_at(0));
        let mut land = record_at(64);
        land.tag = "LAND".to_string();
        land.form_id = 0x0000_4444;
        result.add_main_record(land);
        let land_ids = result.formids_for_tag("LAND");
        assert!(land_ids.contains(&0x0000_4444));
        assert_eq!(land_ids.len(), 1);
    }
}
