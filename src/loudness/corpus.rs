//! Directory corpora with their cached loudness reference.
//!
//! [`Corpus::scan`] reads every candidate file of a directory once, measures
//! its dBFS, and keeps the reference [`LoudnessStatistic`] for the rest of
//! the run.  Silent files are dropped from the draw pool because normalizing
//! them is undefined.

use std::path::{Path, PathBuf};

use crate::audio::{list_candidate_files, load_audio};
use crate::error::{MergeError, Result};

use super::estimator::{Aggregation, CorpusSource, LoudnessStatistic};

/// One source directory, measured.
#[derive(Debug, Clone)]
pub struct Corpus {
    directory: PathBuf,
    /// Non-silent candidate files, sorted by name.
    files: Vec<PathBuf>,
    reference: LoudnessStatistic,
}

impl Corpus {
    /// Scan `directory` and compute its `percentile` loudness reference.
    ///
    /// # Errors
    ///
    /// * [`MergeError::EmptyCorpus`]: no `.wav` file, or every file is
    ///   silent.
    /// * [`MergeError::InvalidArgument`]: `percentile` is outside `[0, 1]`.
    /// * [`MergeError::Wav`]: a candidate file could not be decoded.
    pub fn scan(directory: &Path, percentile: f64) -> Result<Self> {
        let candidates = list_candidate_files(directory)?;

        let mut files = Vec::with_capacity(candidates.len());
        let mut measurements = Vec::with_capacity(candidates.len());
        for path in candidates {
            let dbfs = load_audio(&path)?.dbfs();
            if dbfs.is_finite() {
                measurements.push(dbfs);
                files.push(path);
            } else {
                log::warn!("corpus: skipping silent file {}", path.display());
            }
        }

        let aggregation = if percentile == 0.5 {
            Aggregation::Median
        } else {
            Aggregation::Percentile(percentile)
        };
        let reference = LoudnessStatistic::from_measurements(
            &measurements,
            aggregation,
            CorpusSource::Directory(directory.to_path_buf()),
        )
        .map_err(|e| match e {
            MergeError::EmptyCorpus(_) => MergeError::EmptyCorpus(format!(
                "every .wav file in {} is silent",
                directory.display()
            )),
            other => other,
        })?;

        log::info!(
            "corpus: {}: {} usable files, {} reference {:.2} dBFS",
            directory.display(),
            files.len(),
            reference.aggregation,
            reference.value_db
        );

        Ok(Self {
            directory: directory.to_path_buf(),
            files,
            reference,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn reference(&self) -> &LoudnessStatistic {
        &self.reference
    }

    /// Reference loudness in dBFS.
    pub fn reference_db(&self) -> f64 {
        self.reference.value_db
    }
}

impl LoudnessStatistic {
    /// Reference loudness of every non-silent candidate file in `directory`.
    pub fn for_directory(directory: &Path, percentile: f64) -> Result<Self> {
        Corpus::scan(directory, percentile).map(|corpus| corpus.reference)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
