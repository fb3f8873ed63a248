// Mon Aug 24 2026 - Alex
//
// Finding the live string-interning table inside the capture with no symbols:
// scan writable data sections for three consecutive valid pointers (the
// sibling global table roots), then structurally validate the third as a
// hash table by sampling bucket chains and counting decoded identifiers.

use crate::config::ScanConfig;
use crate::memory::CaptureImage;
use crate::utils::strings;
use log::{debug, info};

use crate::runtime::pe;

/// Table header layout (16 bytes): vtable-like pointer, bucket count, bucket
/// array pointer, entry count.
pub const TABLE_VTABLE_OFFSET: u64 = 0;
pub const TABLE_BUCKET_COUNT_OFFSET: u64 = 4;
pub const TABLE_BUCKET_ARRAY_OFFSET: u64 = 8;
pub const TABLE_ENTRY_COUNT_OFFSET: u64 = 12;

/// Chain node layout (12 bytes): next, key, value.
pub const NODE_NEXT_OFFSET: u64 = 0;
pub const NODE_KEY_OFFSET: u64 = 4;
pub const NODE_VALUE_OFFSET: u64 = 8;

const SAMPLE_BUCKET_LIMIT: u32 = 50;
const SAMPLE_STRING_LEN: usize = 64;
const ACCEPT_SCORE: u32 = 1;
const SHORT_CIRCUIT_SCORE: u32 = 3;

#[derive(Debug, Clone)]
pub struct HashTableCandidate {
    pub table_va: u64,
    pub table_file_offset: u64,
    pub bucket_count: u32,
    pub bucket_array_va: u64,
    pub bucket_array_file_offset: u64,
    pub validation_score: u32,
    /// First of the three sibling pointers: the FormID-keyed table.
    pub sibling_table_va: Option<u64>,
}

/// Structural validation of a candidate table root. Samples up to 50 evenly
/// spaced buckets, follows one chain hop and one string pointer per sample,
/// and scores how many decode to syntactically valid identifiers.
pub fn validate_candidate<C: CaptureImage>(
    capture: &C,
    table_va: u64,
    config: &ScanConfig,
) -> Option<HashTableCandidate> {
    let vtable = capture.read_u32_at(table_va + TABLE_VTABLE_OFFSET)?;
    capture.resolve(vtable as u64)?;
    let bucket_count = capture.read_u32_at(table_va + TABLE_BUCKET_COUNT_OFFSET)?;
    if bucket_count < config.min_bucket_count || bucket_count > config.max_bucket_count {
        return None;
    }
    let bucket_array_va = capture.read_u32_at(table_va + TABLE_BUCKET_ARRAY_OFFSET)? as u64;
    let bucket_array_file_offset = capture.resolve(bucket_array_va)?;

    let stride = (bucket_count / SAMPLE_BUCKET_LIMIT).max(1);
    let mut score = 0u32;
    let mut index = 0u32;
    while index < bucket_count {
        if let Some(head) = capture.read_u32_at(bucket_array_va + index as u64 * 4) {
            if head != 0 {
                if let Some(key) = capture.read_u32_at(head as u64 + NODE_KEY_OFFSET) {
                    if let Some(text) = capture.read_c_string_at(key as u64, SAMPLE_STRING_LEN) {
                        if strings::is_valid_identifier(&text) {
                            score += 1;
                        }
                    }
                }
            }
        }
        index += stride;
    }

    if score < ACCEPT_SCORE {
        return None;
    }
    Some(HashTableCandidate {
        table_va,
        table_file_offset: capture.resolve(table_va)?,
        bucket_count,
        bucket_array_va,
        bucket_array_file_offset,
        validation_score: score,
        sibling_table_va: None,
    })
}

/// Walk the selected data sections at 4-byte alignment looking for the
/// pointer-triple signature, validating the third pointer as the identifier
/// table root. A candidate scoring >= 3 commits immediately; otherwise the
/// best candidate scoring >= 1 wins after the scan.
pub fn locate_string_table<C: CaptureImage>(
    capture: &C,
    config: &ScanConfig,
    sections_scanned: &mut u64,
) -> Option<HashTableCandidate> {
    let module = capture
        .modules()
        .iter()
        .find(|m| m.name.to_ascii_lowercase().ends_with(".exe"))
        .or_else(|| capture.modules().first())?;
    let sections = match pe::parse_sections(capture, module.base_address) {
        Ok(sections) => sections,
        Err(e) => {
            debug!("section parse failed for {}: {}", module.name, e);
            return None;
        }
    };

    let mut best: Option<HashTableCandidate> = None;
    for section in pe::select_data_sections(&sections) {
        *sections_scanned += 1;
        let start = module.base_address + section.virtual_address as u64;
        let mut offset = 0u64;
        while offset + 12 <= section.virtual_size as u64 {
            let va = start + offset;
            offset += 4;
            let Some(p1) = capture.read_u32_at(va) else {
                continue;
            };
            let Some(p2) = capture.read_u32_at(va + 4) else {
                continue;
            };
            let Some(p3) = capture.read_u32_at(va + 8) else {
                continue;
            };
            if p1 == 0 || p2 == 0 || p3 == 0 {
                continue;
            }
            if capture.resolve(p1 as u64).is_none()
                || capture.resolve(p2 as u64).is_none()
                || capture.resolve(p3 as u64).is_none()
            {
                continue;
            }
            if let Some(mut candidate) = validate_candidate(capture, p3 as u64, config) {
                candidate.sibling_table_va = Some(p1 as u64);
                info!(
                    "table candidate at {:#x} in {} scored {}",
                    candidate.table_va, section.name, candidate.validation_score
                );
                if candidate.validation_score >= SHORT_CIRCUIT_SCORE {
                    return Some(candidate);
                }
                let better = best
                    .as_ref()
                    .map(|b| candidate.validation_score > b.validation_score)
                    .unwrap_or(true);
                if better {
                    best = Some(candidate);
                }
            }
        }
    }
    best
}
