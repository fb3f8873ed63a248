// Fri Aug 21 2026 - Alex
//
// The outer scan loop. One pass, byte-granular: at each position the driver
// first attempts a main-record header (behind the false-positive denylist),
// then a GRUP header, then dispatches to a subrecord detector through a
// u32-keyed tag table covering both byte orders. Confirmed main records get
// their body scanned for subrecords once, then skipped.

use crate::config::ScanConfig;
use crate::memory::bytes;
use crate::records::header::{self, MAIN_HEADER_LEN};
use crate::records::subrecord::{self, Subrecord, SUBRECORD_HEADER_LEN};
use crate::records::tags;
use crate::scan::result::ScanResult;
use ahash::AHashMap;
use log::debug;
use once_cell::sync::Lazy;
use std::ops::Range;

type DetectorFn = fn(&[u8], usize, u64) -> Option<Subrecord>;

fn table_insert(table: &mut AHashMap<u32, DetectorFn>, tag: &[u8; 4], f: DetectorFn) {
    table.insert(u32::from_le_bytes(*tag), f);
    table.insert(u32::from_be_bytes(*tag), f);
}

/// Tag -> detector dispatch, keyed on the raw little-endian u32 read of the
/// tag bytes. Both orientations of every tag are present, so one unswapped
/// read probes the table regardless of record endianness.
static DETECTOR_TABLE: Lazy<AHashMap<u32, DetectorFn>> = Lazy::new(|| {
    let mut table: AHashMap<u32, DetectorFn> = AHashMap::new();
    table_insert(&mut table, b"EDID", subrecord::try_detect_identifier);
    table_insert(&mut table, b"FULL", subrecord::try_detect_free_text);
    table_insert(&mut table, b"DESC", subrecord::try_detect_free_text);
    table_insert(&mut table, b"NAM1", subrecord::try_detect_free_text);
    table_insert(&mut table, b"MODL", subrecord::try_detect_path);
    table_insert(&mut table, b"ICON", subrecord::try_detect_path);
    table_insert(&mut table, b"MICO", subrecord::try_detect_path);
    table_insert(&mut table, b"SCTX", subrecord::try_detect_script);
    table_insert(&mut table, b"SCRO", subrecord::try_detect_formid_ref);
    table_insert(&mut table, b"NAME", subrecord::try_detect_formid_ref);
    table_insert(&mut table, b"SCRI", subrecord::try_detect_formid_ref);
    table_insert(&mut table, b"XOWN", subrecord::try_detect_formid_ref);
    table_insert(&mut table, b"VHGT", subrecord::try_detect_terrain_height);
    table_insert(&mut table, b"XCLC", subrecord::try_detect_cell_grid);
    table_insert(&mut table, b"DATA", subrecord::try_detect_placement);
    table
});

pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Whole-buffer scan.
    pub fn scan(&self, data: &[u8]) -> ScanResult {
        let mut result = ScanResult::new();
        self.scan_into(data, 0, &[], &mut result);
        result
    }

    /// Scan `data` (a whole buffer or one chunk) into an existing result.
    /// `base_offset` makes recorded offsets absolute; `exclusions` are
    /// absolute ranges skipped without inspection.
    pub fn scan_into(
        &self,
        data: &[u8],
        base_offset: u64,
        exclusions: &[Range<u64>],
        result: &mut ScanResult,
    ) {
        let mut i = 0usize;
        while i + 4 <= data.len() {
            let absolute = base_offset + i as u64;
            if let Some(excluded) = exclusions.iter().find(|r| r.contains(&absolute)) {
                let next = excluded.end.saturating_sub(base_offset) as usize;
                i = next.max(i + 1);
                continue;
            }

            if !tags::is_known_false_positive(data, i) {
                if let Some(record) = header::try_parse_main_record(data, i, base_offset) {
                    let span = (record.span() as usize).min(data.len() - i);
                    debug!(
                        "main record {} form {:#010x} at {:#x}",
                        record.tag, record.form_id, record.offset
                    );
                    result.add_main_record(record);
                    if self.config.skip_ahead {
                        // The body is walked once for subrecords, then the
                        // whole declared span is jumped.
                        let body_end = i + span;
                        self.scan_subrecords_between(
                            data,
                            i + MAIN_HEADER_LEN,
                            body_end,
                            base_offset,
                            result,
                        );
                        i += span.max(1);
                        continue;
                    }
                    i += 1;
                    continue;
                }
                if let Some(group) = header::try_parse_group(data, i, base_offset) {
                    // Only the 24-byte group header is consumed; group
                    // contents are re-scanned as ordinary records.
                    result.add_group(group);
                    i += MAIN_HEADER_LEN;
                    continue;
                }
            }

            self.try_subrecord_at(data, i, base_offset, result);
            i += 1;
        }
        result.counters.bytes_scanned += data.len() as u64;
    }

    fn scan_subrecords_between(
        &self,
        data: &[u8],
        start: usize,
        end: usize,
        base_offset: u64,
        result: &mut ScanResult,
    ) {
        let mut i = start;
        while i < end && i + SUBRECORD_HEADER_LEN <= data.len() {
            self.try_subrecord_at(data, i, base_offset, result);
            i += 1;
        }
    }

    fn try_subrecord_at(
        &self,
        data: &[u8],
        offset: usize,
        base_offset: u64,
        result: &mut ScanResult,
    ) -> bool {
        if offset + SUBRECORD_HEADER_LEN > data.len() {
            return false;
        }
        let Some(raw) = bytes::read_tag(data, offset) else {
            return false;
        };
        let value = u32::from_le_bytes(raw);
        if let Some(detector) = DETECTOR_TABLE.get(&value) {
            if let Some(sub) = detector(data, offset, base_offset) {
                debug!(
                    "subrecord {:?} at {:#x}",
                    sub.kind(),
                    base_offset + offset as u64
                );
                result.add_subrecord(sub);
                return true;
            }
        }
        // Path payloads show up under tags with no dedicated detector.
        if let Some(sub) = subrecord::try_detect_path(data, offset, base_offset) {
            result.add_subrecord(sub);
            return true;
        }
        if let Some(sub) = subrecord::try_detect_generic(data, offset, base_offset) {
            result.add_subrecord(sub);
            return true;
        }
        false
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SubrecordKind;

    pub fn build_record(tag: &[u8; 4], form_id: u32, body: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag);
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&form_id.to_le_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(body);
        buf
    }

    pub fn build_subrecord(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag);
        buf.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_end_to_end_gmst() {
        let body = build_subrecord(b"EDID", b"fTest\0");
        let buf = build_record(b"GMST", 0x123, &body);

        let scanner = Scanner::default();
        let mut result = scanner.scan(&buf);

        assert_eq!(result.record_count(), 1);
        assert_eq!(result.main_records[0].tag, "GMST");
        assert_eq!(result.main_records[0].form_id, 0x123);

        let idents = result.subrecords_of(SubrecordKind::Identifier);
        assert_eq!(idents.len(), 1);
        match &idents[0] {
            Subrecord::Identifier { text, .. } => assert_eq!(text, "fTest"),
            other => panic!("unexpected: {:?}", other),
        }

        crate::scan::correlate::correlate_identifiers(&buf, &mut result, 200);
        assert_eq!(result.editor_ids.get(&0x123).map(String::as_str), Some("fTest"));
    }

    #[test]
    fn test_truncation_never_panics() {
        let body = build_subrecord(b"EDID", b"SomeQuest_01\0");
        let buf = build_record(b"WEAP", 0x0100_2345, &body);
        for end in 0..=buf.len() {
            let scanner = Scanner::default();
            let _ = scanner.scan(&buf[..end]);
        }
    }

    #[test]
    fn test_idempotence() {
        let mut buf = build_record(b"GMST", 0x123, &build_subrecord(b"EDID", b"fTest\0"));
        buf.extend_from_slice(&build_record(b"WEAP", 0x0100_2345, &[0xAA; 16]));

        let scanner = Scanner::default();
        let a = scanner.scan(&buf);
        let b = scanner.scan(&buf);
        assert_eq!(a.record_count(), b.record_count());
        assert_eq!(a.subrecord_count(), b.subrecord_count());
        let offs_a: Vec<u64> = a.main_records.iter().map(|r| r.offset).collect();
        let offs_b: Vec<u64> = b.main_records.iter().map(|r| r.offset).collect();
        assert_eq!(offs_a, offs_b);
    }

    #[test]
    fn test_skip_ahead_equivalence() {
        // Well-formed, non-overlapping records back to back.
        let mut buf = Vec::new();
        buf.extend_from_slice(&build_record(b"GMST", 0x123, &[0x01; 10]));
        buf.extend_from_slice(&build_record(b"WEAP", 0x0100_2345, &[0x02; 32]));
        buf.extend_from_slice(&build_record(b"NPC_", 0x0200_0001, &[0x03; 8]));

        let fast = Scanner::default().scan(&buf);
        let naive = Scanner::new(ScanConfig {
            skip_ahead: false,
            ..ScanConfig::default()
        })
        .scan(&buf);

        let summarize = |r: &ScanResult| {
            r.main_records
                .iter()
                .map(|m| (m.offset, m.tag.clone(), m.form_id, m.body_size))
                .collect::<Vec<_>>()
        };
        assert_eq!(summarize(&fast), summarize(&naive));
        assert_eq!(fast.record_count(), 3);
    }

    #[test]
    fn test_denylist_blocks_header() {
        // A denylisted tag with otherwise-valid header fields must not be
        // accepted as a record even though its shape fits the fallback rule.
        let buf = build_record(b"RPTR", 0x0100_0001, &[0u8; 10]);
        let result = Scanner::default().scan(&buf);
        assert_eq!(result.record_count(), 0);
    }

    #[test]
    fn test_exclusion_ranges() {
        let buf = build_record(b"GMST", 0x123, &[0x01; 10]);
        let scanner = Scanner::default();
        let mut result = ScanResult::new();
        scanner.scan_into(&buf, 0, &[0..buf.len() as u64], &mut result);
        assert_eq!(result.record_count(), 0);
    }

    #[test]
    fn test_big_endian_record_detected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"TSMG");
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0x0123u32.to_be_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(&[0u8; 10]);
        let result = Scanner::default().scan(&buf);
        assert_eq!(result.record_count(), 1);
        assert!(result.main_records[0].big_endian);
        assert_eq!(result.main_records[0].tag, "GMST");
        assert_eq!(result.main_records[0].form_id, 0x123);
    }
}
