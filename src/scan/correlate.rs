// Fri Aug 21 2026 - Alex
//
// Backward FormID correlation: an identifier subrecord is attributed to the
// nearest plausible record header behind it without fully parsing the
// enclosing record. First candidate scanning backward wins.

use crate::memory::bytes;
use crate::memory::{BufferPool, MappedFile};
use crate::records::subrecord::Subrecord;
use crate::records::tags;
use crate::scan::result::ScanResult;
use crate::SubrecordKind;
use log::debug;

const MAX_CANDIDATE_BODY: u32 = 10_000_000;

/// Search backward from `e - 4` down to `e - window` for a header whose
/// declared body actually covers the identifier at local offset `e`. The
/// FormID field is held to the stricter referenced-FormID shape (plugin
/// index capped at 0x0F).
pub fn find_enclosing_formid(data: &[u8], e: usize, window: usize) -> Option<u32> {
    if e < 4 {
        return None;
    }
    let lowest = e.saturating_sub(window);
    for c in (lowest..=e - 4).rev() {
        if c + 24 >= data.len() {
            continue;
        }
        let Some(marker) = bytes::read_tag(data, c) else {
            continue;
        };
        if !tags::is_record_marker(marker) {
            continue;
        }
        let Some(form_id) = bytes::read_u32(data, c + 12, false) else {
            continue;
        };
        if form_id == 0 || form_id == 0xFFFF_FFFF || (form_id >> 24) > 0x0F {
            continue;
        }
        let Some(size) = bytes::read_u32(data, c + 4, false) else {
            continue;
        };
        if size == 0 || size >= MAX_CANDIDATE_BODY {
            continue;
        }
        // The identifier must fall inside this candidate's claimed body.
        if (e as u64) < c as u64 + 24 + size as u64 {
            return Some(form_id);
        }
    }
    None
}

/// Whole-buffer enrichment pass: map every detected identifier back to its
/// enclosing FormID where one can be found. Uncorrelated identifiers are
/// simply left out of the map.
pub fn correlate_identifiers(data: &[u8], result: &mut ScanResult, window: usize) {
    let pairs: Vec<(u32, String)> = result
        .subrecords_of(SubrecordKind::Identifier)
        .iter()
        .filter_map(|sub| match sub {
            Subrecord::Identifier { text, offset, .. } => {
                find_enclosing_formid(data, *offset as usize, window)
                    .map(|form_id| (form_id, text.clone()))
            }
            _ => None,
        })
        .collect();

    debug!("correlated {} identifiers", pairs.len());
    for (form_id, text) in pairs {
        result.set_editor_id(form_id, &text);
    }
}

/// Memory-mapped variant: identical algorithm over a rented window buffer
/// positioned so the identifier's local offset within the buffer matches its
/// distance from the window start.
pub fn correlate_identifiers_mapped(
    mapped: &MappedFile,
    result: &mut ScanResult,
    window: usize,
    pool: &BufferPool,
) {
    let mut pairs: Vec<(u32, String)> = Vec::new();
    {
        let mut rented = pool.rent();
        for sub in result.subrecords_of(SubrecordKind::Identifier) {
            let Subrecord::Identifier { text, offset, .. } = sub else {
                continue;
            };
            let start = offset.saturating_sub(window as u64);
            let local_e = (offset - start) as usize;
            let buf = rented.as_mut_slice();
            // Candidates only read up to c+28 <= e+24, so a clamped window
            // still covers every backward candidate that can be checked.
            let want = (local_e + 24 + 4).min(buf.len());
            let Ok(got) = mapped.read_into(start, &mut buf[..want]) else {
                continue;
            };
            if let Some(form_id) = find_enclosing_formid(&buf[..got], local_e, window) {
                pairs.push((form_id, text.clone()));
            }
        }
    }
    for (form_id, text) in pairs {
        result.set_editor_id(form_id, &text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_identifier() -> (Vec<u8>, usize) {
        // 24-byte header + EDID subrecord at offset 24.
        let mut buf = Vec::new();
        buf.extend_from_slice(b"GMST");
        buf.extend_from_slice(&12u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0x0123u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(b"EDID");
        buf.extend_from_slice(&6u16.to_le_bytes());
        buf.extend_from_slice(b"fTest\0");
        (buf, 24)
    }

    #[test]
    fn test_nearest_header_wins() {
        let (buf, e) = record_with_identifier();
        assert_eq!(find_enclosing_formid(&buf, e, 200), Some(0x123));
    }

    #[test]
    fn test_identifier_outside_claimed_body() {
        // Header claims a 1-byte body, identifier sits 16 bytes past it.
        let mut buf = Vec::new();
        buf.extend_from_slice(b"GMST");
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0x0123u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(&[0xEEu8; 16]);
        let e = buf.len();
        buf.extend_from_slice(b"EDID");
        buf.extend_from_slice(&6u16.to_le_bytes());
        buf.extend_from_slice(b"fTest\0");
        buf.extend_from_slice(&[0u8; 32]);
        assert_eq!(find_enclosing_formid(&buf, e, 200), None);
    }

    #[test]
    fn test_plugin_index_cap() {
        let (mut buf, e) = record_with_identifier();
        buf[12..16].copy_from_slice(&0x1000_0123u32.to_le_bytes());
        assert_eq!(find_enclosing_formid(&buf, e, 200), None);
    }

    #[test]
    fn test_window_bound() {
        let (buf, e) = record_with_identifier();
        let mut padded = vec![0xEEu8; 300];
        padded.extend_from_slice(&buf);
        // Window too small to reach back to the header.
        assert_eq!(find_enclosing_formid(&padded, 300 + e, 10), None);
        assert_eq!(find_enclosing_formid(&padded, 300 + e, 200), Some(0x123));
    }
}
