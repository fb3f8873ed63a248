// Thu Aug 20 2026 - Alex
//
// Static tag tables. Tags in little-endian plugins appear as their four
// characters in order; console records carry the same four bytes reversed.
// Both orientations are precomputed so the hot scan loop does one raw
// little-endian u32 read and two set probes, no swapping.

use ahash::AHashSet;
use once_cell::sync::Lazy;

/// Every top-level record type observed across the supported game builds.
/// TES4 (the plugin header) is included; GRUP is handled structurally by the
/// header parser and deliberately absent here.
pub const MAIN_RECORD_TAGS: &[&[u8; 4]] = &[
    b"TES4", b"GMST", b"TXST", b"MICN", b"GLOB", b"CLAS", b"FACT", b"HDPT", b"HAIR", b"EYES",
    b"RACE", b"SOUN", b"ASPC", b"MGEF", b"SCPT", b"LTEX", b"ENCH", b"SPEL", b"ACTI", b"TACT",
    b"TERM", b"ARMO", b"BOOK", b"CONT", b"DOOR", b"INGR", b"LIGH", b"MISC", b"STAT", b"SCOL",
    b"MSTT", b"PWAT", b"GRAS", b"TREE", b"FURN", b"WEAP", b"AMMO", b"NPC_", b"CREA", b"LVLC",
    b"LVLN", b"KEYM", b"ALCH", b"IDLM", b"NOTE", b"PROJ", b"LVLI", b"WTHR", b"CLMT", b"REGN",
    b"NAVI", b"CELL", b"REFR", b"ACHR", b"ACRE", b"PMIS", b"PGRE", b"PBEA", b"WRLD", b"LAND",
    b"NAVM", b"TLOD", b"DIAL", b"INFO", b"QUST", b"IDLE", b"PACK", b"CSTY", b"LSCR", b"ANIO",
    b"WATR", b"EFSH", b"EXPL", b"DEBR", b"IMGS", b"IMAD", b"FLST", b"PERK", b"BPTD", b"ADDN",
    b"AVIF", b"RADS", b"CAMS", b"CPTH", b"VTYP", b"IPCT", b"IPDS", b"ARMA", b"ECZN", b"MESG",
    b"RGDL", b"DOBJ", b"LGTM", b"MUSC", b"IMOD", b"REPU", b"RCPE", b"RCCT", b"CHIP", b"CSNO",
    b"LSCT", b"MSET", b"ALOC", b"CHAL", b"AMEF", b"CCRD", b"CMNY", b"CDCK", b"DEHY", b"HUNG",
    b"SLPD",
];

/// Known subrecord tags, gating the generic fallback detector so it cannot
/// accept arbitrary uppercase noise.
pub const SUBRECORD_TAGS: &[&[u8; 4]] = &[
    b"EDID", b"FULL", b"DESC", b"DATA", b"OBND", b"MODL", b"MODB", b"MODT", b"ICON", b"MICO",
    b"SCRI", b"SNAM", b"VNAM", b"ANAM", b"BNAM", b"CNAM", b"DNAM", b"ENAM", b"FNAM", b"GNAM",
    b"HNAM", b"INAM", b"JNAM", b"KNAM", b"LNAM", b"MNAM", b"NNAM", b"ONAM", b"PNAM", b"QNAM",
    b"RNAM", b"TNAM", b"UNAM", b"WNAM", b"XNAM", b"YNAM", b"ZNAM", b"NAM0", b"NAM1", b"NAM2",
    b"NAM3", b"NAM4", b"NAM5", b"NAM6", b"NAM7", b"NAM8", b"NAM9", b"XCLC", b"XCLR", b"XCLL",
    b"XCLW", b"VHGT", b"VNML", b"VCLR", b"VTEX", b"ATXT", b"BTXT", b"VTXT", b"SCTX", b"SCDA",
    b"SCHR", b"SCRO", b"SCRV", b"SLSD", b"SCVR", b"CTDA", b"COED", b"CNTO", b"NAME", b"XEZN",
    b"XRGD", b"XSCL", b"XLOC", b"XOWN", b"XRNK", b"XESP", b"XTEL", b"XMRK", b"XLCM", b"FLTV",
    b"FLAG", b"EFID", b"EFIT", b"SPIT", b"ENIT", b"DODT", b"INDX", b"INTV", b"TRDT", b"QSTA",
    b"QSDT", b"QOBJ", b"PKDT", b"PLDT", b"PSDT", b"PTDT", b"IDLA", b"IDLC", b"IDLF", b"IDLT",
    b"BMDT", b"ETYP", b"BIPL", b"XLKR", b"REPL", b"EITM", b"EAMT", b"NIFZ", b"KFFZ", b"BRUS",
    b"RPLI", b"RPLD", b"RDAT", b"RCLR", b"RPGR", b"RSND", b"RWTH", b"TPIC", b"PQEV", b"CRDT",
    b"VATS", b"VANM", b"MSDT", b"IMPS", b"IMPF", b"MMRK", b"XACT", b"XATO", b"XPRD", b"XPPA",
    b"XORD", b"XPOD", b"NVER", b"NVMI", b"NVCI", b"NVVX", b"NVTR", b"NVCA", b"NVDP", b"NVGD",
    b"NVEX", b"XHLP", b"XRDO", b"XAMT", b"XAMC", b"XRAD", b"XCHG", b"XAPD", b"XAPR", b"XCNT",
];

/// Four-byte sequences that look like record tags but are GPU/debug register
/// name fragments dumped alongside real data in console captures. Checked in
/// both orientations before any main-record header is accepted.
pub const FALSE_POSITIVE_TAGS: &[&[u8; 4]] = &[
    b"RPTR", b"WPTR", b"CP_R", b"CP_I", b"VGT_", b"SQ_P", b"SQ_T", b"RB_C", b"RB_D", b"GPR_",
    b"MEMD", b"REGS", b"PM4_", b"D3DD", b"GPUD",
];

fn tag_value_le(tag: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*tag)
}

fn tag_value_reversed(tag: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*tag)
}

/// Known main-record tags as raw little-endian u32 values.
pub static MAIN_TAGS_LE: Lazy<AHashSet<u32>> =
    Lazy::new(|| MAIN_RECORD_TAGS.iter().map(|t| tag_value_le(t)).collect());

/// The same tags byte-reversed, as seen in big-endian records.
pub static MAIN_TAGS_REVERSED: Lazy<AHashSet<u32>> = Lazy::new(|| {
    MAIN_RECORD_TAGS
        .iter()
        .map(|t| tag_value_reversed(t))
        .collect()
});

pub static SUBRECORD_TAGS_LE: Lazy<AHashSet<u32>> =
    Lazy::new(|| SUBRECORD_TAGS.iter().map(|t| tag_value_le(t)).collect());

pub static SUBRECORD_TAGS_REVERSED: Lazy<AHashSet<u32>> = Lazy::new(|| {
    SUBRECORD_TAGS
        .iter()
        .map(|t| tag_value_reversed(t))
        .collect()
});

/// Direct 4-byte tag equality at `offset`, no allocation.
pub fn matches(data: &[u8], offset: usize, tag: &[u8; 4]) -> bool {
    data.get(offset..offset + 4)
        .map(|b| b == tag)
        .unwrap_or(false)
}

/// Denylist probe; the reversed form covers the big-endian presentation of
/// the same register fragment.
pub fn is_known_false_positive(data: &[u8], offset: usize) -> bool {
    let Some(bytes) = data.get(offset..offset + 4) else {
        return false;
    };
    let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
    let reversed = [bytes[3], bytes[2], bytes[1], bytes[0]];
    FALSE_POSITIVE_TAGS
        .iter()
        .any(|fp| **fp == raw || **fp == reversed)
}

pub fn is_known_subrecord_tag(raw: [u8; 4]) -> bool {
    let value = u32::from_le_bytes(raw);
    SUBRECORD_TAGS_LE.contains(&value) || SUBRECORD_TAGS_REVERSED.contains(&value)
}

/// Fallback shape for main-record types not in the table: four uppercase
/// ASCII letters or underscores. Digit-bearing main tags (TES4) are already
/// in the static set, so the fallback stays strict.
pub fn is_plausible_main_tag(raw: [u8; 4]) -> bool {
    raw.iter().all(|&b| b.is_ascii_uppercase() || b == b'_')
}

/// Subrecord tag shape: digits are legitimate here (NAM0..NAM9).
pub fn is_plausible_tag(raw: [u8; 4]) -> bool {
    raw.iter()
        .all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// Looser marker check used by the backward FormID correlation: any ASCII
/// letter, digit, or underscore per byte.
pub fn is_record_marker(raw: [u8; 4]) -> bool {
    raw.iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'_')
}

pub fn tag_to_string(raw: [u8; 4]) -> String {
    raw.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_orders_precomputed() {
        let le = u32::from_le_bytes(*b"GMST");
        let be = u32::from_le_bytes(*b"TSMG");
        assert!(MAIN_TAGS_LE.contains(&le));
        assert!(MAIN_TAGS_REVERSED.contains(&be));
        assert!(!MAIN_TAGS_LE.contains(&be));
    }

    #[test]
    fn test_false_positive_both_orientations() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RPTR");
        buf.extend_from_slice(b"RTPR");
        assert!(is_known_false_positive(&buf, 0));
        assert!(is_known_false_positive(&buf, 4));
        assert!(!is_known_false_positive(b"GMST", 0));
    }

    #[test]
    fn test_subrecord_registry_gate() {
        assert!(is_known_subrecord_tag(*b"EDID"));
        assert!(is_known_subrecord_tag(*b"DIDE"));
        assert!(!is_known_subrecord_tag(*b"ZZZZ"));
    }

    #[test]
    fn test_tag_shapes() {
        assert!(is_plausible_tag(*b"NPC_"));
        assert!(is_plausible_tag(*b"NAM0"));
        assert!(!is_plausible_tag(*b"npc_"));
        assert!(is_plausible_main_tag(*b"NPC_"));
        assert!(!is_plausible_main_tag(*b"QQ1_"));
        assert!(is_record_marker(*b"abC1"));
        assert!(!is_record_marker(*b"ab c"));
    }
}
