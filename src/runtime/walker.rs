// Mon Aug 24 2026 - Alex
//
// Bucket-chain extraction once a table root is committed. Every pointer read
// goes through the capture resolver; a broken node truncates its own chain
// and bumps a counter, nothing aborts the walk.

use crate::config::ScanConfig;
use crate::memory::CaptureImage;
use crate::runtime::calibrate;
use crate::runtime::locate::{
    self, HashTableCandidate, NODE_KEY_OFFSET, NODE_NEXT_OFFSET, NODE_VALUE_OFFSET,
    TABLE_BUCKET_ARRAY_OFFSET, TABLE_BUCKET_COUNT_OFFSET,
};
use crate::scan::{ScanCounters, ScanResult};
use crate::utils::strings;
use log::{info, warn};
use serde::Serialize;

/// Object header layout: form-type discriminant byte at +4, FormID at +0xC.
pub const OBJECT_FORM_TYPE_OFFSET: u64 = 4;
pub const OBJECT_FORM_ID_OFFSET: u64 = 0xC;

const KEY_STRING_MAX: usize = 255;

/// One (identifier, form type, FormID) tuple pulled from the live table.
/// `display_name` and `secondary_text` are filled by the calibration passes
/// when the layout for that form type is known.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeIdentifierEntry {
    pub identifier: String,
    pub form_id: u32,
    pub form_type: u8,
    pub string_file_offset: u64,
    pub object_va: u64,
    pub object_file_offset: Option<u64>,
    pub display_name: Option<String>,
    pub secondary_text: Option<String>,
}

pub struct RuntimeTableWalker {
    config: ScanConfig,
}

impl RuntimeTableWalker {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Full pipeline: locate the identifier table, walk every bucket, run the
    /// display-name and dialogue calibration passes, then the FormID-keyed
    /// sibling table for un-keyed records. Returns the committed candidate,
    /// or `None` when no table survives validation.
    pub fn run<C: CaptureImage>(
        &self,
        capture: &C,
        result: &mut ScanResult,
    ) -> Option<HashTableCandidate> {
        let candidate = locate::locate_string_table(
            capture,
            &self.config,
            &mut result.counters.sections_scanned,
        )?;
        info!(
            "committed table at {:#x}: {} buckets, score {}",
            candidate.table_va, candidate.bucket_count, candidate.validation_score
        );
        self.walk_table(capture, &candidate, result);

        calibrate::decode_display_names(capture, &mut result.runtime_entries);
        calibrate::decode_dialogue(capture, &mut result.runtime_entries);
        if let Some(sibling_va) = candidate.sibling_table_va {
            calibrate::walk_formid_table(capture, sibling_va, &self.config, result);
        }
        let pairs: Vec<(u32, String)> = result
            .runtime_entries
            .iter()
            .filter(|e| e.form_id != 0)
            .map(|e| (e.form_id, e.identifier.clone()))
            .collect();
        for (form_id, name) in pairs {
            result.set_editor_id(form_id, &name);
        }
        Some(candidate)
    }

    /// Walk every bucket of a committed candidate, appending entries without
    /// deduplication.
    pub fn walk_table<C: CaptureImage>(
        &self,
        capture: &C,
        candidate: &HashTableCandidate,
        result: &mut ScanResult,
    ) {
        for index in 0..candidate.bucket_count as u64 {
            let Some(head) = capture.read_u32_at(candidate.bucket_array_va + index * 4) else {
                continue;
            };
            if head == 0 {
                continue;
            }
            result.counters.chains_walked += 1;
            self.walk_chain(capture, head as u64, result);
        }
        info!(
            "walked {} chains, {} entries, {} chain errors",
            result.counters.chains_walked,
            result.runtime_entries.len(),
            result.counters.chain_errors
        );
    }

    fn walk_chain<C: CaptureImage>(&self, capture: &C, head: u64, result: &mut ScanResult) {
        let mut node = head;
        let mut hops = 0usize;
        while node != 0 {
            if hops >= self.config.chain_walk_limit {
                warn!("chain at {:#x} hit the traversal cap", head);
                result.counters.chain_errors += 1;
                return;
            }
            hops += 1;
            let Some(next) = capture.read_u32_at(node + NODE_NEXT_OFFSET) else {
                result.counters.chain_errors += 1;
                return;
            };
            if let Some(entry) = self.decode_node(capture, node, &mut result.counters) {
                result.runtime_entries.push(entry);
            }
            node = next as u64;
        }
    }

    /// A key or value pointer that fails to resolve is a broken intermediate
    /// pointer and counts as a chain error; a key that resolves but decodes
    /// to junk is an ordinary validation reject and counts nothing.
    fn decode_node<C: CaptureImage>(
        &self,
        capture: &C,
        node: u64,
        counters: &mut ScanCounters,
    ) -> Option<RuntimeIdentifierEntry> {
        let key = capture.read_u32_at(node + NODE_KEY_OFFSET)?;
        let Some(identifier) = capture.read_c_string_at(key as u64, KEY_STRING_MAX) else {
            counters.chain_errors += 1;
            return None;
        };
        if !strings::is_valid_identifier(&identifier) {
            return None;
        }
        let object_va = capture.read_u32_at(node + NODE_VALUE_OFFSET)? as u64;
        let object_file_offset = if object_va == 0 {
            None
        } else {
            let resolved = capture.resolve(object_va);
            if resolved.is_none() {
                counters.chain_errors += 1;
            }
            resolved
        };
        let mut form_type = 0u8;
        let mut form_id = 0u32;
        if object_file_offset.is_some() {
            if let Some(raw) = capture.read_bytes_at(object_va + OBJECT_FORM_TYPE_OFFSET, 1) {
                form_type = raw[0];
            }
            form_id = capture
                .read_u32_at(object_va + OBJECT_FORM_ID_OFFSET)
                .unwrap_or(0);
        }
        Some(RuntimeIdentifierEntry {
            identifier,
            form_id,
            form_type,
            string_file_offset: capture.resolve(key as u64)?,
            object_va,
            object_file_offset,
            display_name: None,
            secondary_text: None,
        })
    }
}

/// Header reads shared with the sibling-table walk in the calibration pass.
pub(crate) fn read_table_header<C: CaptureImage>(
    capture: &C,
    table_va: u64,
    config: &ScanConfig,
) -> Option<(u32, u64)> {
    let bucket_count = capture.read_u32_at(table_va + TABLE_BUCKET_COUNT_OFFSET)?;
    if bucket_count < config.min_bucket_count || bucket_count > config.max_bucket_count {
        return None;
    }
    let bucket_array_va = capture.read_u32_at(table_va + TABLE_BUCKET_ARRAY_OFFSET)? as u64;
    capture.resolve(bucket_array_va)?;
    Some((bucket_count, bucket_array_va))
}


#[cfg(test)]
mod tests {
    use super::test_table::*;
    use super::*;
    use crate::runtime::pe::test_image::{put_u32_be, IMAGE_BASE};

    #[test]
    fn test_walk_extracts_entries() {
        let mut image = new_image();
        put_entry(&mut image, 0, "PlayerRef", 0x18, 0x0000_0014);
        put_entry(&mut image, 1, "VMQ01Quest", 0x4D, 0x0010_A2BF);
        put_entry(&mut image, 2, "GREETING", 0x2C, 0x0002_1FD2);
        let capture = capture_for(&image);

        let mut result = ScanResult::new();
        let walker = RuntimeTableWalker::new(ScanConfig::default());
        let candidate = walker.run(&capture, &mut result).unwrap();

        assert_eq!(candidate.bucket_count, 64);
        assert_eq!(result.runtime_entries.len(), 3);
        assert_eq!(result.counters.chains_walked, 3);
        assert_eq!(result.counters.chain_errors, 0);
        let player = &result.runtime_entries[0];
        assert_eq!(player.identifier, "PlayerRef");
        assert_eq!(player.form_type, 0x18);
        assert_eq!(player.form_id, 0x14);
        assert!(player.object_file_offset.is_some());
        assert_eq!(result.editor_ids.get(&0x14).map(String::as_str), Some("PlayerRef"));
    }

    #[test]
    fn test_multi_node_chain() {
        let mut image = new_image();
        put_entry(&mut image, 0, "FirstRef", 0x18, 1);
        put_entry(&mut image, 1, "SecondRef", 0x18, 2);
        // Link bucket 0's node to bucket 1's node and empty bucket 1, making
        // one chain of two.
        let base = IMAGE_BASE as u32;
        put_u32_be(&mut image, NODE_BASE, base + (NODE_BASE + 16) as u32);
        put_u32_be(&mut image, BUCKET_ARRAY_OFFSET + 4, 0);
        let capture = capture_for(&image);

        let mut result = ScanResult::new();
        let walker = RuntimeTableWalker::new(ScanConfig::default());
        let candidate = locate::validate_candidate(
            &capture,
            IMAGE_BASE + TABLE_OFFSET as u64,
            &ScanConfig::default(),
        )
        .unwrap();
        walker.walk_table(&capture, &candidate, &mut result);

        assert_eq!(result.counters.chains_walked, 1);
        let names: Vec<&str> = result
            .runtime_entries
            .iter()
            .map(|e| e.identifier.as_str())
            .collect();
        assert_eq!(names, vec!["FirstRef", "SecondRef"]);
    }

    #[test]
    fn test_broken_next_pointer_truncates_chain_only() {
        let mut image = new_image();
        put_entry(&mut image, 0, "SurvivesRef", 0x18, 1);
        put_entry(&mut image, 1, "OtherRef", 0x18, 2);
        // First node's next points at an unmapped address.
        put_u32_be(&mut image, NODE_BASE, 0x9900_0000);
        let capture = capture_for(&image);

        let mut result = ScanResult::new();
        let walker = RuntimeTableWalker::new(ScanConfig::default());
        let candidate = locate::validate_candidate(
            &capture,
            IMAGE_BASE + TABLE_OFFSET as u64,
            &ScanConfig::default(),
        )
        .unwrap();
        walker.walk_table(&capture, &candidate, &mut result);

        // The node before the break still lands, the second chain is intact.
        assert_eq!(result.runtime_entries.len(), 2);
        assert_eq!(result.counters.chain_errors, 1);
        assert_eq!(result.counters.chains_walked, 2);
    }

    #[test]
    fn test_cyclic_chain_hits_cap() {
        let mut image = new_image();
        put_entry(&mut image, 0, "LoopRef", 0x18, 1);
        // Self-loop.
        let base = IMAGE_BASE as u32;
        put_u32_be(&mut image, NODE_BASE, base + NODE_BASE as u32);
        let capture = capture_for(&image);

        let mut config = ScanConfig::default();
        config.chain_walk_limit = 5;
        let mut result = ScanResult::new();
        let walker = RuntimeTableWalker::new(config.clone());
        let candidate =
            locate::validate_candidate(&capture, IMAGE_BASE + TABLE_OFFSET as u64, &config)
                .unwrap();
        walker.walk_table(&capture, &candidate, &mut result);

        assert_eq!(result.runtime_entries.len(), 5);
        assert_eq!(result.counters.chain_errors, 1);
    }

    #[test]
    fn test_nodes_without_object_still_yield_identifier() {
        let mut image = new_image();
        put_entry(&mut image, 0, "DanglingRef", 0x18, 7);
        // Point the value at unmapped memory.
        put_u32_be(&mut image, NODE_BASE + 8, 0x9900_0000);
        let capture = capture_for(&image);

        let mut result = ScanResult::new();
        let walker = RuntimeTableWalker::new(ScanConfig::default());
        let candidate = locate::validate_candidate(
            &capture,
            IMAGE_BASE + TABLE_OFFSET as u64,
            &ScanConfig::default(),
        )
        .unwrap();
        walker.walk_table(&capture, &candidate, &mut result);

        assert_eq!(result.runtime_entries.len(), 1);
        let entry = &result.runtime_entries[0];
        assert_eq!(entry.identifier, "DanglingRef");
        assert_eq!(entry.form_id, 0);
        assert_eq!(entry.form_type, 0);
        assert!(entry.object_file_offset.is_none());
        // The dangling value pointer is a broken pointer, not a clean miss.
        assert_eq!(result.counters.chain_errors, 1);
    }

    #[test]
    fn test_junk_keys_rejected() {
        // Non-identifier key strings must not become entries: too short,
        // punctuation, single character.
        let mut image = new_image();
        put_entry(&mut image, 0, "PlayerRef", 0x18, 0x0000_0014);
        put_entry(&mut image, 1, "!!", 0x18, 0x0000_0015);
        put_entry(&mut image, 2, "a", 0x18, 0x0000_0016);
        let capture = capture_for(&image);

        let mut result = ScanResult::new();
        let walker = RuntimeTableWalker::new(ScanConfig::default());
        walker.run(&capture, &mut result).unwrap();

        let names: Vec<&str> = result
            .runtime_entries
            .iter()
            .map(|e| e.identifier.as_str())
            .collect();
        assert_eq!(names, vec!["PlayerRef"]);
        assert!(result.editor_ids.get(&0x15).is_none());
        assert!(result.editor_ids.get(&0x16).is_none());
        // Junk keys are validation rejects, not pointer failures.
        assert_eq!(result.counters.chain_errors, 0);
    }

    #[test]
    fn test_broken_key_pointer_counts_chain_error() {
        let mut image = new_image();
        put_entry(&mut image, 0, "GoneRef", 0x18, 1);
        put_entry(&mut image, 1, "KeptRef", 0x18, 2);
        // First node's key string pointer is unmapped.
        put_u32_be(&mut image, NODE_BASE + 4, 0x9900_0000);
        let capture = capture_for(&image);

        let mut result = ScanResult::new();
        let walker = RuntimeTableWalker::new(ScanConfig::default());
        let candidate = locate::validate_candidate(
            &capture,
            IMAGE_BASE + TABLE_OFFSET as u64,
            &ScanConfig::default(),
        )
        .unwrap();
        walker.walk_table(&capture, &candidate, &mut result);

        let names: Vec<&str> = result
            .runtime_entries
            .iter()
            .map(|e| e.identifier.as_str())
            .collect();
        assert_eq!(names, vec!["KeptRef"]);
        assert_eq!(result.counters.chain_errors, 1);
    }
}
