// Thu Aug 20 2026 - Alex

use serde::{Deserialize, Serialize};

/// Tunable scan parameters. Defaults are the reference values, tuned against
/// real captures; tests shrink windows through here instead of forking scan
/// logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Jump past a confirmed main record's declared body instead of
    /// re-attempting a header at every interior byte.
    pub skip_ahead: bool,
    /// Window size for the memory-mapped chunked scan.
    pub chunk_size: usize,
    /// Trailing overlap re-scanned at each chunk boundary so straddling
    /// records are not lost.
    pub chunk_overlap: usize,
    /// How far the FormID correlator searches backward from an identifier
    /// for its enclosing record header.
    pub correlation_window: usize,
    /// Per-chain node cap in the runtime hash-table walker.
    pub chain_walk_limit: usize,
    /// Hard cap on accepted asset-path strings.
    pub asset_path_limit: usize,
    /// Bucket-count sanity range for hash-table candidates.
    pub min_bucket_count: u32,
    pub max_bucket_count: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_ahead: true,
            chunk_size: 16 * 1024 * 1024,
            chunk_overlap: 1024,
            correlation_window: 200,
            chain_walk_limit: 1000,
            asset_path_limit: 100_000,
            min_bucket_count: 64,
            max_bucket_count: 262_144,
        }
    }
}
