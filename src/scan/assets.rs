// Fri Aug 21 2026 - Alex
//
// Free-text scan independent of record structure: NUL-terminated ASCII runs
// that look like game asset paths or spoken dialogue. A run that hits a
// non-printable byte before any NUL is binary noise, not a C string, and is
// dropped whole.

use crate::scan::result::{AssetCategory, AssetPath, ScanResult};
use crate::utils::strings;
use ahash::AHashSet;
use log::info;

const MIN_RUN_LEN: usize = 8;
const MAX_RUN_LEN: usize = 260;
const MAX_DIALOGUE_LEN: usize = 200;

const MODEL_EXTENSIONS: &[&str] = &["nif", "egm", "spt"];
const TEXTURE_EXTENSIONS: &[&str] = &["dds", "tga", "bmp"];
const SOUND_EXTENSIONS: &[&str] = &["wav", "ogg", "mp3", "lip"];
const ANIMATION_EXTENSIONS: &[&str] = &["kf", "idle"];

fn categorize(path: &str) -> Option<AssetCategory> {
    let ext = path.rsplit('.').next()?;
    if MODEL_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::Model)
    } else if TEXTURE_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::Texture)
    } else if SOUND_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::Sound)
    } else if ANIMATION_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::Animation)
    } else {
        None
    }
}

fn is_path_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'.' || b == b'\\' || b == b'/'
}

fn looks_like_dialogue(s: &str) -> bool {
    if s.len() < MIN_RUN_LEN || s.len() > MAX_DIALOGUE_LEN {
        return false;
    }
    let first = s.as_bytes()[0];
    first.is_ascii_uppercase()
        && s.contains(' ')
        && matches!(s.as_bytes()[s.len() - 1], b'.' | b'!' | b'?')
}

pub struct AssetStringScanner {
    limit: usize,
}

impl AssetStringScanner {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn scan_into(&self, data: &[u8], base_offset: u64, result: &mut ScanResult) {
        let mut seen_dialogue: AHashSet<String> = AHashSet::new();
        let mut i = 0usize;
        while i < data.len() {
            if !is_path_start(data[i]) {
                i += 1;
                continue;
            }
            // Extend to the terminator or the first non-printable byte.
            let mut j = i;
            while j < data.len() && strings::is_printable_ascii(data[j]) && j - i <= MAX_RUN_LEN {
                j += 1;
            }
            let terminated = j < data.len() && data[j] == 0;
            let run_len = j - i;
            if run_len == 0 {
                i += 1;
                continue;
            }
            if terminated && (MIN_RUN_LEN..=MAX_RUN_LEN).contains(&run_len) {
                if let Ok(text) = std::str::from_utf8(&data[i..j]) {
                    self.consider_run(text, base_offset + i as u64, result, &mut seen_dialogue);
                }
            }
            // The whole run is consumed either way; suffixes of the same
            // C string are not separate candidates.
            i = j + 1;
        }
        info!(
            "asset scan: {} paths, {} dialogue lines",
            result.asset_paths.len(),
            result.dialogue_lines.len()
        );
    }

    fn consider_run(
        &self,
        text: &str,
        offset: u64,
        result: &mut ScanResult,
        seen_dialogue: &mut AHashSet<String>,
    ) {
        if strings::looks_like_path(text) {
            let cleaned = strings::clean_asset_path(text);
            if let Some(category) = categorize(&cleaned) {
                result.add_asset_path(
                    AssetPath {
                        path: cleaned,
                        category,
                        offset,
                    },
                    self.limit,
                );
                return;
            }
        }
        if looks_like_dialogue(text)
            && result.dialogue_lines.len() < self.limit
            && seen_dialogue.insert(text.to_ascii_lowercase())
        {
            result.dialogue_lines.push(text.to_string());
        }
    }
}
