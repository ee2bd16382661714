//! Per-clip and per-corpus loudness statistics.
//!
//! Loudness is RMS-based dBFS ([`SampleBuffer::dbfs`]).  Corpus references
//! use a **nearest-rank** percentile: the dBFS values are sorted ascending and
//! the value at `clamp(floor(n * p), 0, n - 1)` is returned, with no
//! interpolation.  Silent clips (`-inf` dBFS) are excluded first so a corpus
//! with many silent files does not drag the reference towards silence.
//!
//! # Example
//!
//! ```rust
//! use sound_merge::loudness::percentile_of_values;
//!
//! let median = percentile_of_values(&[-10.0, -30.0, -20.0], 0.5).unwrap();
//! assert_eq!(median, -20.0);
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::audio::SampleBuffer;
use crate::error::{MergeError, Result};

// ---------------------------------------------------------------------------
// LoudnessStatistic
// ---------------------------------------------------------------------------

/// How a corpus of dBFS values was reduced to one reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Aggregation {
    Median,
    Percentile(f64),
}

impl Aggregation {
    /// The percentile this aggregation indexes at.
    pub fn percentile(&self) -> f64 {
        match self {
            Aggregation::Median => 0.5,
            Aggregation::Percentile(p) => *p,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Median => write!(f, "median"),
            Aggregation::Percentile(p) => write!(f, "p{:.0}", p * 100.0),
        }
    }
}

/// What the statistic was computed over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusSource {
    Directory(PathBuf),
    Buffers(usize),
}

/// A reference loudness computed once per run and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoudnessStatistic {
    /// Reference level in dBFS.
    pub value_db: f64,
    pub aggregation: Aggregation,
    pub corpus: CorpusSource,
    /// Number of non-silent clips the statistic was taken over.
    pub measured: usize,
}

impl LoudnessStatistic {
    /// Reduce already-measured dBFS values.
    pub fn from_measurements(
        values: &[f64],
        aggregation: Aggregation,
        corpus: CorpusSource,
    ) -> Result<Self> {
        let value_db = percentile_of_values(values, aggregation.percentile())?;
        Ok(Self {
            value_db,
            aggregation,
            corpus,
            measured: values.iter().filter(|v| v.is_finite()).count(),
        })
    }

    /// Measure and reduce a list of in-memory buffers.
    pub fn from_buffers(buffers: &[SampleBuffer], aggregation: Aggregation) -> Result<Self> {
        let values: Vec<f64> = buffers.iter().map(SampleBuffer::dbfs).collect();
        Self::from_measurements(&values, aggregation, CorpusSource::Buffers(buffers.len()))
    }
}

// ---------------------------------------------------------------------------
// Percentiles
// ---------------------------------------------------------------------------

/// Nearest-rank percentile of `values`, ignoring non-finite entries.
///
/// # Errors
///
/// * [`MergeError::InvalidArgument`]: `percentile` is outside `[0, 1]`.
/// * [`MergeError::EmptyCorpus`]: no finite value remains after filtering.
pub fn percentile_of_values(values: &[f64], percentile: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&percentile) {
        return Err(MergeError::InvalidArgument(format!(
            "percentile must be within [0, 1], got {percentile}"
        )));
    }

    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(MergeError::EmptyCorpus(
            "no non-silent clips to compute a loudness reference from".into(),
        ));
    }

    finite.sort_by(f64::total_cmp);
    let n = finite.len();
    let index = ((n as f64 * percentile).floor() as usize).min(n - 1);
    Ok(finite[index])
}

/// Nearest-rank percentile of the buffers' dBFS values.
pub fn compute_corpus_percentile(buffers: &[SampleBuffer], percentile: f64) -> Result<f64> {
    let values: Vec<f64> = buffers.iter().map(SampleBuffer::dbfs).collect();
    percentile_of_values(&values, percentile)
}

/// Median dBFS: `sorted[n / 2]`, the `0.5` nearest-rank percentile.
pub fn compute_median(buffers: &[SampleBuffer]) -> Result<f64> {
    compute_corpus_percentile(buffers, 0.5)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSpec;
    use crate::test_support::constant;

    fn spec() -> AudioSpec {
        AudioSpec::new(1, 8_000, 16)
    }

    /// Constant buffer whose dBFS is `20*log10(amplitude)`.
    fn at_amplitude(amplitude: f64) -> SampleBuffer {
        constant(amplitude, 100, spec())
    }

    #[test]
    fn nearest_rank_median_of_three() {
        assert_eq!(percentile_of_values(&[-30.0, -20.0, -10.0], 0.5).unwrap(), -20.0);
    }

    #[test]
    fn nearest_rank_does_not_interpolate() {
        // floor(4 * 0.5) = 2 → third value, not the mean of the middle two
        let values = [-40.0, -30.0, -20.0, -10.0];
        assert_eq!(percentile_of_values(&values, 0.5).unwrap(), -20.0);
        // floor(4 * 0.3) = 1
        assert_eq!(percentile_of_values(&values, 0.3).unwrap(), -30.0);
    }

    #[test]
    fn percentile_bounds_are_clamped() {
        let values = [-30.0, -20.0, -10.0];
        assert_eq!(percentile_of_values(&values, 0.0).unwrap(), -30.0);
        // floor(3 * 1.0) = 3 → clamped to last index
        assert_eq!(percentile_of_values(&values, 1.0).unwrap(), -10.0);
    }

    #[test]
    fn silence_is_excluded() {
        let values = [f64::NEG_INFINITY, f64::NEG_INFINITY, -30.0, -20.0, -10.0];
        assert_eq!(percentile_of_values(&values, 0.5).unwrap(), -20.0);
    }

    #[test]
    fn all_silent_is_empty_corpus() {
        let err = percentile_of_values(&[f64::NEG_INFINITY], 0.5).unwrap_err();
        assert!(matches!(err, MergeError::EmptyCorpus(_)), "{err}");
        assert!(matches!(percentile_of_values(&[], 0.5).unwrap_err(), MergeError::EmptyCorpus(_)));
    }

    #[test]
    fn out_of_range_percentile_rejected() {
        for p in [-0.1, 1.5, f64::NAN] {
            let err = percentile_of_values(&[-20.0], p).unwrap_err();
            assert!(matches!(err, MergeError::InvalidArgument(_)), "p={p}: {err}");
        }
    }

    #[test]
    fn corpus_percentile_over_buffers() {
        let buffers = vec![
            at_amplitude(0.1),
            SampleBuffer::silent(spec(), 100).unwrap(),
            at_amplitude(0.5),
            at_amplitude(0.25),
        ];
        let median = compute_median(&buffers).unwrap();
        // finite dBFS sorted: 0.1, 0.25, 0.5 → index 1
        assert!((median - 20.0 * 0.25_f64.log10()).abs() < 1e-3, "median = {median}");
    }

    #[test]
    fn statistic_records_method_and_corpus() {
        let buffers = vec![at_amplitude(0.1), at_amplitude(0.5)];
        let stat = LoudnessStatistic::from_buffers(&buffers, Aggregation::Percentile(0.0)).unwrap();
        assert!((stat.value_db - (-20.0)).abs() < 1e-3);
        assert_eq!(stat.corpus, CorpusSource::Buffers(2));
        assert_eq!(stat.measured, 2);
        assert_eq!(stat.aggregation.to_string(), "p0");
        assert_eq!(Aggregation::Median.percentile(), 0.5);
    }
}
