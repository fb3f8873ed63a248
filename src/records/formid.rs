// Thu Aug 20 2026 - Alex

/// FormID layout: top byte is the plugin index, low 24 bits the per-plugin
/// sequence number. Zero and all-ones are reserved sentinels.
pub fn plugin_index(form_id: u32) -> u8 {
    (form_id >> 24) as u8
}

pub fn sequence_number(form_id: u32) -> u32 {
    form_id & 0x00FF_FFFF
}

/// Base validity for a FormID read out of a main-record header. Beyond the
/// sentinel values, a FormID whose four bytes are all printable ASCII is
/// rejected outright: that shape almost always means the scan position sits
/// inside a string literal that locally resembles a tag + FormID pair.
pub fn is_valid_formid(form_id: u32) -> bool {
    if form_id == 0 || form_id == 0xFFFF_FFFF {
        return false;
    }
    !all_bytes_printable(form_id)
}

/// Stricter form used by FormID-reference subrecords and the backward
/// correlator: the plugin index is additionally capped at 0x0F, matching the
/// load orders seen in real captures.
pub fn is_valid_referenced_formid(form_id: u32) -> bool {
    is_valid_formid(form_id) && plugin_index(form_id) <= 0x0F
}

fn all_bytes_printable(value: u32) -> bool {
    value
        .to_le_bytes()
        .iter()
        .all(|&b| (0x20..=0x7E).contains(&b))
}
