// Thu Aug 20 2026 - Alex
//
// Text plausibility checks shared by the subrecord detectors, the runtime
// table walker, and the asset scanner. These predicates are the accept/reject
// core of the whole recovery pipeline; the thresholds are tuned against real
// captures and must not drift.

/// Editor-ID syntax: starts with a letter, letters/digits/underscore only,
/// total length 2..=200. Long strings that are just a short block repeating
/// (common in uninitialized heap fill) are rejected.
pub fn is_valid_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes.len() > 200 {
        return false;
    }
    if !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    if !bytes
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return false;
    }
    !is_repeating_junk(s)
}

/// Junk heuristic: an 8+ character value made entirely of one 2..=6 character
/// block repeated three or more times, e.g. "abcabcabcabc".
pub fn is_repeating_junk(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 8 {
        return false;
    }
    for block_len in 2..=6usize {
        if bytes.len() % block_len != 0 {
            continue;
        }
        let count = bytes.len() / block_len;
        if count < 3 {
            continue;
        }
        let block = &bytes[..block_len];
        if bytes.chunks(block_len).all(|chunk| chunk == block) {
            return true;
        }
    }
    false
}

/// Game-setting names carry a type-prefix convention: f(loat), i(nt),
/// s(tring), b(ool).
pub fn is_setting_name(s: &str) -> bool {
    if s.len() < 2 || s.len() >= 256 {
        return false;
    }
    matches!(
        s.as_bytes()[0].to_ascii_lowercase(),
        b'f' | b'i' | b's' | b'b'
    )
}

pub fn printable_ratio(bytes: &[u8]) -> f32 {
    if bytes.is_empty() {
        return 0.0;
    }
    let printable = bytes.iter().filter(|&&b| (0x20..=0x7E).contains(&b)).count();
    printable as f32 / bytes.len() as f32
}

pub fn is_mostly_printable(bytes: &[u8]) -> bool {
    printable_ratio(bytes) >= 0.8
}

pub fn is_printable_ascii(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

/// Windows MAX_PATH; asset references never exceed it.
pub const MAX_PATH_LEN: usize = 260;

pub fn looks_like_path(s: &str) -> bool {
    if s.len() > MAX_PATH_LEN {
        return false;
    }
    (s.contains('\\') || s.contains('/')) && s.contains('.') && !s.contains('\0')
}

/// Lowercase, forward-slash canonical form used for case-insensitive asset
/// dedup and for downstream exporters.
pub fn clean_asset_path(s: &str) -> String {
    s.trim().replace('\\', "/").to_ascii_lowercase()
}

const SCRIPT_KEYWORDS: &[&str] = &[
    "scriptname",
    "scn ",
    "begin ",
    "if ",
    "endif",
    "ref",
    "getstage",
    "setstage",
    "player.",
    "getisid",
];

/// Script-source gate, tuned for recall over precision: genuine script text
/// always hits at least one keyword, while most binary noise hits none.
pub fn contains_script_keyword(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    SCRIPT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
