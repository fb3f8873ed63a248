// Fri Aug 21 2026 - Alex
//
// Chunked scan over a memory-mapped capture. Fixed-size windows with a small
// trailing overlap keep peak memory bounded on multi-gigabyte inputs; the
// overlap re-scans the boundary region so straddling records are still seen,
// and the result's absolute-offset dedup folds the doubles out.

use crate::config::ScanConfig;
use crate::memory::{BufferPool, MappedFile};
use crate::scan::driver::Scanner;
use crate::scan::result::ScanResult;
use log::info;
use std::ops::Range;

/// Synchronous progress callback: (bytes processed, total bytes, records so
/// far). Invoked once per chunk.
pub type ProgressFn<'a> = dyn FnMut(u64, u64, usize) + 'a;

pub struct ChunkedScanner {
    scanner: Scanner,
    pool: BufferPool,
}

impl ChunkedScanner {
    pub fn new(config: ScanConfig) -> Self {
        let window = config.chunk_size + config.chunk_overlap;
        Self {
            scanner: Scanner::new(config),
            pool: BufferPool::new(window),
        }
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn scan_file(
        &self,
        mapped: &MappedFile,
        exclusions: &[Range<u64>],
        mut progress: Option<&mut ProgressFn<'_>>,
    ) -> ScanResult {
        let mut result = ScanResult::new();
        let total = mapped.len();
        let step = self.scanner.config().chunk_size as u64;
        if step == 0 || total == 0 {
            return result;
        }

        let mut pos = 0u64;
        while pos < total {
            {
                let mut rented = self.pool.rent();
                let buf = rented.as_mut_slice();
                let got = match mapped.read_into(pos, buf) {
                    Ok(got) => got,
                    Err(_) => break,
                };
                self.scanner.scan_into(&buf[..got], pos, exclusions, &mut result);
            }
            result.counters.chunks_scanned += 1;
            if let Some(cb) = progress.as_deref_mut() {
                let done = (pos + step).min(total);
                cb(done, total, result.record_count());
            }
            pos += step;
        }

        info!(
            "chunked scan: {} chunks, {} records, {} subrecords",
            result.counters.chunks_scanned,
            result.record_count(),
            result.subrecord_count()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::correlate;
    use std::fs::File;
    use std::io::Write;

    fn record(tag: &[u8; 4], form_id: u32, body: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag);
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&form_id.to_le_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(body);
        buf
    }

    fn write_temp(name: &str, data: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        File::create(&path).unwrap().write_all(data).unwrap();
        path
    }

    #[test]
    fn test_chunked_matches_whole_buffer() {
        // Records deliberately straddle the tiny chunk boundary.
        let mut data = Vec::new();
        let mut edid = Vec::new();
        edid.extend_from_slice(b"EDID");
        edid.extend_from_slice(&10u16.to_le_bytes());
        edid.extend_from_slice(b"WeapNVRif\0");
        data.extend_from_slice(&record(b"GMST", 0x123, &[0x01; 40]));
        data.extend_from_slice(&record(b"WEAP", 0x0100_2345, &edid));
        data.extend_from_slice(&record(b"NPC_", 0x0200_0001, &[0x03; 30]));

        let path = write_temp("esmdig_chunk_test.bin", &data);
        let mapped = MappedFile::open(&path).unwrap();

        let config = ScanConfig {
            chunk_size: 64,
            chunk_overlap: 48,
            ..ScanConfig::default()
        };
        let chunked = ChunkedScanner::new(config.clone());
        let mut calls = 0usize;
        let mut cb = |done: u64, total: u64, _found: usize| {
            assert!(done <= total);
            calls += 1;
        };
        let mut result = chunked.scan_file(&mapped, &[], Some(&mut cb));
        assert!(calls >= 2);

        let whole = Scanner::new(config).scan(&data);
        let offsets = |r: &ScanResult| {
            r.main_records
                .iter()
                .map(|m| (m.offset, m.tag.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(offsets(&result), offsets(&whole));
        assert_eq!(result.record_count(), 3);

        correlate::correlate_identifiers_mapped(&mapped, &mut result, 200, chunked.pool());
        assert_eq!(
            result.editor_ids.get(&0x0100_2345).map(String::as_str),
            Some("WeapNVRif")
        );
        std::fs::remove_file(&path).ok();
    }
}
