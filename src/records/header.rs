// Thu Aug 20 2026 - Alex

use crate::memory::bytes;
use crate::records::{formid, tags};
use serde::Serialize;

/// Main record header: tag(0,4) size(4,4) flags(8,4) formId(12,4), then
/// 8 bytes this layer does not interpret.
pub const MAIN_HEADER_LEN: usize = 24;

/// Declared body sizes above this are treated as noise, not records.
pub const MAX_RECORD_BODY: u32 = 10_000_000;

const COMPRESSED_FLAG: u32 = 0x0004_0000;

#[derive(Debug, Clone, Serialize)]
pub struct DetectedMainRecord {
    pub tag: String,
    pub body_size: u32,
    pub flags: u32,
    pub form_id: u32,
    pub offset: u64,
    pub big_endian: bool,
}

impl DetectedMainRecord {
    /// Total bytes the record spans, letting the scan driver jump past the
    /// declared body instead of re-scanning interior bytes.
    pub fn span(&self) -> u64 {
        MAIN_HEADER_LEN as u64 + self.body_size as u64
    }
}

/// Attempt a 24-byte main-record header at `offset`. Endianness is resolved
/// per candidate: the raw tag u32 is probed against the known-tag set in
/// plugin order first, then against the byte-reversed set. `base_offset` is
/// added to `offset` for chunked scans so recorded offsets stay absolute.
pub fn try_parse_main_record(
    data: &[u8],
    offset: usize,
    base_offset: u64,
) -> Option<DetectedMainRecord> {
    if offset + MAIN_HEADER_LEN > data.len() {
        return None;
    }
    let raw = bytes::read_tag(data, offset)?;
    let big_endian = resolve_endianness(raw)?;

    let body_size = bytes::read_u32(data, offset + 4, big_endian)?;
    let flags = bytes::read_u32(data, offset + 8, big_endian)?;
    let form_id = bytes::read_u32(data, offset + 12, big_endian)?;

    if !is_valid_main_record_header(raw, body_size, flags, form_id) {
        return None;
    }

    let tag_chars = if big_endian {
        [raw[3], raw[2], raw[1], raw[0]]
    } else {
        raw
    };
    Some(DetectedMainRecord {
        tag: tags::tag_to_string(tag_chars),
        body_size,
        flags,
        form_id,
        offset: base_offset + offset as u64,
        big_endian,
    })
}

fn resolve_endianness(raw: [u8; 4]) -> Option<bool> {
    let value = u32::from_le_bytes(raw);
    if tags::MAIN_TAGS_LE.contains(&value) {
        return Some(false);
    }
    if tags::MAIN_TAGS_REVERSED.contains(&value) {
        return Some(true);
    }
    // Unseen record types still get a chance if the tag shape holds.
    if tags::is_plausible_main_tag(raw) {
        return Some(false);
    }
    let reversed = [raw[3], raw[2], raw[1], raw[0]];
    if tags::is_plausible_main_tag(reversed) {
        return Some(true);
    }
    None
}

pub fn is_valid_main_record_header(raw_tag: [u8; 4], body_size: u32, flags: u32, form_id: u32) -> bool {
    if body_size == 0 || body_size > MAX_RECORD_BODY {
        return false;
    }
    // Real flag words keep their top 12 bits clear; compressed records are
    // the one exception worth honoring.
    if flags & COMPRESSED_FLAG == 0 && flags >> 20 != 0 {
        return false;
    }
    formid::is_valid_formid(form_id)
}

/// GRUP container header. Same 24-byte footprint, different field meanings:
/// offset 4 is the total group size (header included), offset 8 a
/// context-dependent label, offset 12 a small group-type code.
#[derive(Debug, Clone, Serialize)]
pub struct GroupHeader {
    pub total_size: u32,
    pub label: u32,
    pub group_type: u32,
    pub offset: u64,
    pub big_endian: bool,
}

pub fn try_parse_group(data: &[u8], offset: usize, base_offset: u64) -> Option<GroupHeader> {
    if offset + MAIN_HEADER_LEN > data.len() {
        return None;
    }
    let raw = bytes::read_tag(data, offset)?;
    let big_endian = if raw == *b"GRUP" {
        false
    } else if raw == *b"PURG" {
        true
    } else {
        return None;
    };

    let total_size = bytes::read_u32(data, offset + 4, big_endian)?;
    let label = bytes::read_u32(data, offset + 8, big_endian)?;
    let group_type = bytes::read_u32(data, offset + 12, big_endian)?;

    if total_size < MAIN_HEADER_LEN as u32 || group_type > 10 {
        return None;
    }
    Some(GroupHeader {
        total_size,
        label,
        group_type,
        offset: base_offset + offset as u64,
        big_endian,
    })
}
