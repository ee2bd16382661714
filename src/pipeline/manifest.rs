//! `manifest.json`: what a run produced and how.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{MergeError, Result};
use crate::mix::{DistributionMode, FoldRecord};

/// File name of the manifest inside the destination directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One written output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRecord {
    pub slot: usize,
    pub path: PathBuf,
    /// Zero-based attempt that succeeded.
    pub attempt: usize,
    /// Seed the slot's random generator was created from.
    pub seed: u64,
    /// Chosen file per source, in mixing order.
    pub files: Vec<PathBuf>,
    pub folds: Vec<FoldRecord>,
    pub final_dbfs: f64,
}

/// One input corpus as it was measured at the start of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub directory: PathBuf,
    pub percentile: f64,
    pub reference_dbfs: f64,
    pub usable_files: usize,
}

/// Everything needed to audit or reproduce a run.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub seed: u64,
    pub distribution: DistributionMode,
    pub target_duration_ms: u64,
    pub final_dbfs: Option<f64>,
    pub sources: Vec<SourceSummary>,
    pub slots: Vec<SlotRecord>,
    pub skipped: Vec<usize>,
    pub cancelled: bool,
}

impl Manifest {
    /// Write `manifest.json` into `directory` and return its path.
    ///
    /// Silent levels (`-inf`) are written as `null`.
    pub fn write_to(&self, directory: &Path) -> Result<PathBuf> {
        let path = directory.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|source| MergeError::Manifest {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| MergeError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("manifest: wrote {}", path.display());
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
