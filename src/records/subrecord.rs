// Fri Aug 21 2026 - Alex
//
// Per-kind subrecord detectors. Each takes a candidate offset whose 4-byte
// tag the driver has already matched, reads the 6-byte subrecord header
// (tag + u16 length, length re-read in the opposite byte order when the
// first interpretation is implausible), then applies the kind's content
// validator. A failed predicate is "no match", never an error.

use crate::memory::bytes;
use crate::records::{formid, tags};
use crate::utils::strings;
use serde::Serialize;

pub const SUBRECORD_HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubrecordKind {
    Identifier,
    FreeText,
    Path,
    Script,
    FormIdRef,
    TerrainHeight,
    CellGrid,
    Placement,
    Generic,
}

#[derive(Debug, Clone, Serialize)]
pub enum Subrecord {
    Identifier {
        text: String,
        offset: u64,
        length: u16,
    },
    FreeText {
        tag: String,
        text: String,
        offset: u64,
    },
    Path {
        tag: String,
        path: String,
        offset: u64,
    },
    Script {
        text: String,
        offset: u64,
    },
    FormIdRef {
        tag: String,
        form_id: u32,
        offset: u64,
        big_endian: bool,
    },
    TerrainHeight {
        base_height: f32,
        offset: u64,
    },
    CellGrid {
        x: i32,
        y: i32,
        offset: u64,
    },
    Placement {
        position: [f32; 3],
        rotation: [f32; 3],
        offset: u64,
    },
    Generic {
        tag: String,
        length: u16,
        offset: u64,
    },
}

impl Subrecord {
    pub fn kind(&self) -> SubrecordKind {
        match self {
            Subrecord::Identifier { .. } => SubrecordKind::Identifier,
            Subrecord::FreeText { .. } => SubrecordKind::FreeText,
            Subrecord::Path { .. } => SubrecordKind::Path,
            Subrecord::Script { .. } => SubrecordKind::Script,
            Subrecord::FormIdRef { .. } => SubrecordKind::FormIdRef,
            Subrecord::TerrainHeight { .. } => SubrecordKind::TerrainHeight,
            Subrecord::CellGrid { .. } => SubrecordKind::CellGrid,
            Subrecord::Placement { .. } => SubrecordKind::Placement,
            Subrecord::Generic { .. } => SubrecordKind::Generic,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Subrecord::Identifier { offset, .. }
            | Subrecord::FreeText { offset, .. }
            | Subrecord::Path { offset, .. }
            | Subrecord::Script { offset, .. }
            | Subrecord::FormIdRef { offset, .. }
            | Subrecord::TerrainHeight { offset, .. }
            | Subrecord::CellGrid { offset, .. }
            | Subrecord::Placement { offset, .. }
            | Subrecord::Generic { offset, .. } => *offset,
        }
    }
}

/// Declared length with both-order fallback: little-endian is believed when
/// it is nonzero, under the kind's max, and fits the remaining buffer;
/// otherwise the big-endian reading gets the same checks.
fn read_declared_len(data: &[u8], offset: usize, max: usize) -> Option<(usize, bool)> {
    let fits = |len: usize| len > 0 && len <= max && offset + SUBRECORD_HEADER_LEN + len <= data.len();
    let le = bytes::read_u16(data, offset + 4, false)? as usize;
    if fits(le) {
        return Some((le, false));
    }
    let be = bytes::read_u16(data, offset + 4, true)? as usize;
    if fits(be) {
        return Some((be, true));
    }
    None
}

/// Exact-size kinds only accept one declared length.
fn read_exact_len(data: &[u8], offset: usize, expected: usize) -> Option<bool> {
    read_declared_len(data, offset, expected).and_then(|(len, big)| (len == expected).then_some(big))
}

fn payload<'a>(data: &'a [u8], offset: usize, len: usize) -> Option<&'a [u8]> {
    data.get(offset + SUBRECORD_HEADER_LEN..offset + SUBRECORD_HEADER_LEN + len)
}

fn decode_z_string(raw: &[u8]) -> Option<&str> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..end]).ok()
}

/// EDID-style identifier field: declared length under 256, payload a
/// NUL-terminated name passing the identifier-syntax validator.
pub fn try_detect_identifier(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    let (len, _) = read_declared_len(data, offset, 255)?;
    let raw = payload(data, offset, len)?;
    let text = decode_z_string(raw)?;
    if !strings::is_valid_identifier(text) {
        return None;
    }
    Some(Subrecord::Identifier {
        text: text.to_string(),
        offset: base_offset + offset as u64,
        length: len as u16,
    })
}

/// FULL/DESC display text: up to 512 bytes, at least 2, 80%+ printable.
pub fn try_detect_free_text(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    let raw_tag = bytes::read_tag(data, offset)?;
    let (len, _) = read_declared_len(data, offset, 512)?;
    if len < 2 {
        return None;
    }
    let raw = payload(data, offset, len)?;
    if !strings::is_mostly_printable(raw) {
        return None;
    }
    let text = decode_z_string(raw)?;
    if text.len() < 2 {
        return None;
    }
    Some(Subrecord::FreeText {
        tag: tags::tag_to_string(raw_tag),
        text: text.to_string(),
        offset: base_offset + offset as u64,
    })
}

/// MODL/ICON asset references: MAX_PATH-bounded, must contain a separator and
/// an extension dot, no embedded NUL before the terminator.
pub fn try_detect_path(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    let raw_tag = bytes::read_tag(data, offset)?;
    let (len, _) = read_declared_len(data, offset, strings::MAX_PATH_LEN)?;
    let raw = payload(data, offset, len)?;
    let nul = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    // Anything after the terminator must be terminator padding, not text.
    if raw[nul..].iter().any(|&b| b != 0) {
        return None;
    }
    let text = std::str::from_utf8(&raw[..nul]).ok()?;
    if !strings::looks_like_path(text) {
        return None;
    }
    Some(Subrecord::Path {
        tag: tags::tag_to_string(raw_tag),
        path: text.to_string(),
        offset: base_offset + offset as u64,
    })
}

/// SCTX script source. The keyword gate trades precision for recall: real
/// script text always contains at least one engine keyword.
pub fn try_detect_script(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    let (len, _) = read_declared_len(data, offset, 65535)?;
    let raw = payload(data, offset, len)?;
    let text = String::from_utf8_lossy(raw);
    if !strings::contains_script_keyword(&text) {
        return None;
    }
    Some(Subrecord::Script {
        text: text.into_owned(),
        offset: base_offset + offset as u64,
    })
}

/// Fixed 4-byte FormID reference. Little-endian decode is preferred; the
/// big-endian reading is only taken when little-endian fails the validity
/// predicate.
pub fn try_detect_formid_ref(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    let raw_tag = bytes::read_tag(data, offset)?;
    read_exact_len(data, offset, 4)?;
    let le = bytes::read_u32(data, offset + SUBRECORD_HEADER_LEN, false)?;
    let (form_id, big_endian) = if formid::is_valid_formid(le) {
        (le, false)
    } else {
        let be = bytes::read_u32(data, offset + SUBRECORD_HEADER_LEN, true)?;
        if !formid::is_valid_formid(be) {
            return None;
        }
        (be, true)
    };
    Some(Subrecord::FormIdRef {
        tag: tags::tag_to_string(raw_tag),
        form_id,
        offset: base_offset + offset as u64,
        big_endian,
    })
}

/// VHGT terrain heights: exactly 1089 bytes (4-byte float base + 33x33
/// signed deltas + 3 padding bytes), leading float finite.
pub const TERRAIN_HEIGHT_LEN: usize = 1089;

pub fn try_detect_terrain_height(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    read_exact_len(data, offset, TERRAIN_HEIGHT_LEN)?;
    let le = bytes::read_f32(data, offset + SUBRECORD_HEADER_LEN, false)?;
    let base_height = if le.is_finite() {
        le
    } else {
        let be = bytes::read_f32(data, offset + SUBRECORD_HEADER_LEN, true)?;
        if !be.is_finite() {
            return None;
        }
        be
    };
    Some(Subrecord::TerrainHeight {
        base_height,
        offset: base_offset + offset as u64,
    })
}

/// XCLC cell coordinates: exactly 12 bytes (two grid i32s + flags), both
/// coordinates inside the worldspace grid range.
pub const CELL_GRID_LEN: usize = 12;
const GRID_COORD_RANGE: i32 = 200;

pub fn try_detect_cell_grid(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    read_exact_len(data, offset, CELL_GRID_LEN)?;
    let body = offset + SUBRECORD_HEADER_LEN;
    let in_range = |v: i32| (-GRID_COORD_RANGE..=GRID_COORD_RANGE).contains(&v);
    for big_endian in [false, true] {
        let x = bytes::read_i32(data, body, big_endian)?;
        let y = bytes::read_i32(data, body + 4, big_endian)?;
        if in_range(x) && in_range(y) {
            return Some(Subrecord::CellGrid {
                x,
                y,
                offset: base_offset + offset as u64,
            });
        }
    }
    None
}

/// REFR DATA position/orientation: exactly 24 bytes, six floats, positions
/// bounded to the worldspace extent and rotations to radians-with-margin.
pub const PLACEMENT_LEN: usize = 24;
const MAX_POSITION: f32 = 500_000.0;
const MAX_ROTATION: f32 = 10.0;

pub fn try_detect_placement(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    read_exact_len(data, offset, PLACEMENT_LEN)?;
    let body = offset + SUBRECORD_HEADER_LEN;
    'orders: for big_endian in [false, true] {
        let mut values = [0f32; 6];
        for (i, value) in values.iter_mut().enumerate() {
            *value = bytes::read_f32(data, body + i * 4, big_endian)?;
            if !value.is_finite() {
                continue 'orders;
            }
        }
        let positions_ok = values[..3].iter().all(|v| v.abs() <= MAX_POSITION);
        let rotations_ok = values[3..].iter().all(|v| v.abs() <= MAX_ROTATION);
        if positions_ok && rotations_ok {
            return Some(Subrecord::Placement {
                position: [values[0], values[1], values[2]],
                rotation: [values[3], values[4], values[5]],
                offset: base_offset + offset as u64,
            });
        }
    }
    None
}

/// Registry-gated fallback for subrecord tags with no dedicated detector.
/// The registry membership check (both byte orders) is what keeps this from
/// accepting arbitrary uppercase noise.
pub fn try_detect_generic(data: &[u8], offset: usize, base_offset: u64) -> Option<Subrecord> {
    let raw_tag = bytes::read_tag(data, offset)?;
    if !tags::is_plausible_tag(raw_tag) && !tags::is_plausible_tag([raw_tag[3], raw_tag[2], raw_tag[1], raw_tag[0]]) {
        return None;
    }
    if !tags::is_known_subrecord_tag(raw_tag) {
        return None;
    }
    let (len, _) = read_declared_len(data, offset, 65535)?;
    Some(Subrecord::Generic {
        tag: tags::tag_to_string(raw_tag),
        length: len as u16,
        offset: base_offset + offset as u64,
    })
}
