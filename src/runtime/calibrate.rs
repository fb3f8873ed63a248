// Mon Aug 24 2026 - Alex
//
// Second-pass enrichment over walked entries. The form-type enumeration
// shifts between game builds, so nothing here trusts a static mapping without
// corroboration: dialogue and terrain form types are voted in from the data
// itself, and only the display-name field offsets come from a fixed table of
// observed class layouts.

use crate::config::ScanConfig;
use crate::memory::CaptureImage;
use crate::records::formid;
use crate::runtime::locate::{NODE_KEY_OFFSET, NODE_NEXT_OFFSET, NODE_VALUE_OFFSET};
use crate::runtime::walker::{self, RuntimeIdentifierEntry, OBJECT_FORM_TYPE_OFFSET};
use crate::scan::ScanResult;
use crate::utils::strings;
use ahash::AHashMap;
use log::{debug, info};
use once_cell::sync::Lazy;

/// Display-name field offset per form type, from observed class layouts.
static DISPLAY_NAME_OFFSETS: Lazy<AHashMap<u8, u64>> = Lazy::new(|| {
    let mut m = AHashMap::new();
    m.insert(0x18u8, 0x30u64);
    m.insert(0x19, 0x30);
    m.insert(0x28, 0x2C);
    m
});

/// Dialogue prompt string field inside an INFO-like object.
pub const DIALOGUE_TEXT_OFFSET: u64 = 0x24;

const INFO_CALIBRATION_VOTES: u32 = 5;
const TERRAIN_CALIBRATION_VOTES: u32 = 3;
/// Used when the FormID cross-reference vote does not reach quorum.
pub const TERRAIN_FALLBACK_FORM_TYPE: u8 = 0x4A;

const MAX_FIELD_STRING_LEN: u16 = 512;

/// Length-prefixed string structure: data pointer, then u16 length and
/// capacity. Rejects unmapped data pointers and non-text payloads.
pub fn decode_string_field<C: CaptureImage>(capture: &C, va: u64) -> Option<String> {
    let data_va = capture.read_u32_at(va)? as u64;
    let len = capture.read_u16_at(va + 4)?;
    if len == 0 || len > MAX_FIELD_STRING_LEN {
        return None;
    }
    let raw = capture.read_bytes_at(data_va, len as usize)?;
    if !strings::is_mostly_printable(raw) {
        return None;
    }
    std::str::from_utf8(raw).ok().map(str::to_string)
}

/// Fill `display_name` for entries whose form type has a known field offset.
pub fn decode_display_names<C: CaptureImage>(
    capture: &C,
    entries: &mut [RuntimeIdentifierEntry],
) {
    let mut decoded = 0usize;
    for entry in entries.iter_mut() {
        if entry.object_file_offset.is_none() {
            continue;
        }
        let Some(&field_offset) = DISPLAY_NAME_OFFSETS.get(&entry.form_type) else {
            continue;
        };
        if let Some(name) = decode_string_field(capture, entry.object_va + field_offset) {
            entry.display_name = Some(name);
            decoded += 1;
        }
    }
    debug!("decoded {} display names", decoded);
}

/// Vote in the form type carrying dialogue entries: tally identifiers that
/// contain "topic" (case-insensitive) by form type, accept the majority only
/// with at least 5 matches.
pub fn detect_info_form_type(entries: &[RuntimeIdentifierEntry]) -> Option<u8> {
    let mut votes: AHashMap<u8, u32> = AHashMap::new();
    for entry in entries {
        if entry.identifier.to_ascii_lowercase().contains("topic") {
            *votes.entry(entry.form_type).or_default() += 1;
        }
    }
    votes
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .filter(|&(_, count)| count >= INFO_CALIBRATION_VOTES)
        .map(|(form_type, _)| form_type)
}

/// If dialogue calibration succeeds, re-visit every entry of that form type
/// and decode the prompt-text field into `secondary_text`.
pub fn decode_dialogue<C: CaptureImage>(capture: &C, entries: &mut [RuntimeIdentifierEntry]) {
    let Some(info_type) = detect_info_form_type(entries) else {
        debug!("dialogue form type not calibrated");
        return;
    };
    info!("dialogue form type calibrated to {:#04x}", info_type);
    for entry in entries.iter_mut() {
        if entry.form_type != info_type || entry.object_file_offset.is_none() {
            continue;
        }
        entry.secondary_text = decode_string_field(capture, entry.object_va + DIALOGUE_TEXT_OFFSET);
    }
}

/// Walk the sibling FormID-keyed table for records that carry no identifier
/// string at all. The terrain form type is calibrated by cross-referencing
/// FormIDs already known from the structural scan (at least 3 corroborating
/// matches), falling back to the fixed type otherwise; matching entries get a
/// synthesized `LAND_xxxxxxxx` identifier.
pub fn walk_formid_table<C: CaptureImage>(
    capture: &C,
    table_va: u64,
    config: &ScanConfig,
    result: &mut ScanResult,
) {
    let Some((bucket_count, bucket_array_va)) =
        walker::read_table_header(capture, table_va, config)
    else {
        debug!("sibling table at {:#x} failed header validation", table_va);
        return;
    };

    let mut walked: Vec<(u32, u8, u64)> = Vec::new();
    for index in 0..bucket_count as u64 {
        let Some(head) = capture.read_u32_at(bucket_array_va + index * 4) else {
            continue;
        };
        if head == 0 {
            continue;
        }
        result.counters.chains_walked += 1;
        let mut node = head as u64;
        let mut hops = 0usize;
        while node != 0 {
            if hops >= config.chain_walk_limit {
                result.counters.chain_errors += 1;
                break;
            }
            hops += 1;
            let Some(next) = capture.read_u32_at(node + NODE_NEXT_OFFSET) else {
                result.counters.chain_errors += 1;
                break;
            };
            if let (Some(form_id), Some(object)) = (
                capture.read_u32_at(node + NODE_KEY_OFFSET),
                capture.read_u32_at(node + NODE_VALUE_OFFSET),
            ) {
                // An unresolvable object pointer is a broken pointer, not a
                // validation miss.
                if formid::is_valid_formid(form_id) && object != 0 {
                    match capture.read_bytes_at(object as u64 + OBJECT_FORM_TYPE_OFFSET, 1) {
                        Some(raw) => walked.push((form_id, raw[0], object as u64)),
                        None => result.counters.chain_errors += 1,
                    }
                }
            }
            node = next as u64;
        }
    }

    let known = result.formids_for_tag("LAND");
    let mut votes: AHashMap<u8, u32> = AHashMap::new();
    for &(form_id, form_type, _) in &walked {
        if known.contains(&form_id) {
            *votes.entry(form_type).or_default() += 1;
        }
    }
    let terrain_type = votes
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .filter(|&(_, count)| count >= TERRAIN_CALIBRATION_VOTES)
        .map(|(form_type, _)| form_type)
        .unwrap_or(TERRAIN_FALLBACK_FORM_TYPE);
    info!(
        "terrain form type {:#04x}, {} candidates walked",
        terrain_type,
        walked.len()
    );

    for (form_id, form_type, object_va) in walked {
        if form_type != terrain_type {
            continue;
        }
        result.runtime_entries.push(RuntimeIdentifierEntry {
            identifier: format!("LAND_{:08X}", form_id),
            form_id,
            form_type,
            string_file_offset: 0,
            object_va,
            object_file_offset: capture.resolve(object_va),
            display_name: None,
            secondary_text: None,
        });
    }
}
