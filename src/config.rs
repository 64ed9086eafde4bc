//! Configuration layer: mirrors the recognized option table one field per
//! row, with validation performed once, before any output file is opened.

use crate::errors::{MetaDbgError, Result};
use crate::ingest::DEFAULT_BATCH_SIZE;
use crate::kmer::MAX_K;
use crate::threshold::ThresholdMode;
use std::path::PathBuf;

/// The run-wide configuration a CLI shell (or any other embedder) hands
/// to the library pipeline. Validation is explicit (`validate`), not
/// enforced at construction, so callers can build this incrementally
/// (e.g. from a `clap` struct) before checking it as a whole.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// K-mer length, 1 <= k <= 31.
    pub k: u8,
    /// Minimum unitig length to emit.
    pub sequence_len: usize,
    /// Absolute tau (mutually exclusive with `bottom_cut_percent`).
    pub bad_frequency: Option<i64>,
    /// Percentile tau selection (mutually exclusive with `bad_frequency`).
    pub bottom_cut_percent: Option<u8>,
    /// Soft memory cap for the k-mer table, in bytes.
    pub max_size: usize,
    /// Tau used by the feature-vector builder (C7), independent of the
    /// unitig-construction threshold above.
    pub threshold: i64,
    /// Reads files to ingest.
    pub reads: Vec<PathBuf>,
    /// K-mer count files to ingest (mutually usable alongside `reads`).
    pub kmers: Vec<PathBuf>,
    /// Path to the binary connected-components file.
    pub components_file: Option<PathBuf>,
    /// Worker count; defaults to available processors.
    pub workers: usize,
    /// Reads pulled per ingestion batch.
    pub batch_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            k: 21,
            sequence_len: 0,
            bad_frequency: None,
            bottom_cut_percent: None,
            max_size: 1 << 30,
            threshold: 0,
            reads: Vec::new(),
            kmers: Vec::new(),
            components_file: None,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl RunConfig {
    /// Checks performed before any output file is opened: `1 <= k <=
    /// 31`, `bad_frequency`/`bottom_cut_percent` mutually exclusive,
    /// `workers >= 1`.
    pub fn validate(&self) -> Result<()> {
        if self.k < 1 || self.k as usize > MAX_K {
            return Err(MetaDbgError::InvalidInput(format!(
                "k must be between 1 and {MAX_K}, got {}",
                self.k
            )));
        }
        if self.bad_frequency.is_some() && self.bottom_cut_percent.is_some() {
            return Err(MetaDbgError::InvalidInput(
                "maximal-bad-frequency and bottom-cut-percent are mutually exclusive".into(),
            ));
        }
        if let Some(p) = self.bottom_cut_percent {
            if p > 100 {
                return Err(MetaDbgError::InvalidInput(format!(
                    "bottom-cut-percent must be in [0, 100], got {p}"
                )));
            }
        }
        if self.workers == 0 {
            return Err(MetaDbgError::InvalidInput(
                "workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The threshold-selection mode implied by `bad_frequency` /
    /// `bottom_cut_percent`: absolute, bottom-percent, or the auto
    /// heuristic default.
    pub fn threshold_mode(&self) -> ThresholdMode {
        if let Some(tau) = self.bad_frequency {
            ThresholdMode::Absolute(tau)
        } else if let Some(p) = self.bottom_cut_percent {
            ThresholdMode::BottomPercent(p)
        } else {
            ThresholdMode::Auto
        }
    }
}
