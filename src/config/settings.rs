//! Benchmark settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to worker
//! threads.  Missing keys fall back to their defaults.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::augment::{RandomSegment, SilenceMask};
use crate::error::MergeError;
use crate::mix::DistributionMode;

// ---------------------------------------------------------------------------
// SilenceConfig
// ---------------------------------------------------------------------------

/// Random silence masking applied to one source before mixing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    /// Total silence to insert, in milliseconds (clamped to the clip).
    pub total_ms: u64,
    /// Length of each silenced window.
    pub interval_ms: u64,
    /// Fade applied on both sides of every window.
    pub fade_ms: u64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            total_ms: 1_000,
            interval_ms: 250,
            fade_ms: 20,
        }
    }
}

impl SilenceConfig {
    pub fn to_step(&self) -> SilenceMask {
        SilenceMask {
            total_ms: self.total_ms,
            interval_ms: self.interval_ms,
            fade_ms: self.fade_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

/// One input corpus: a directory of `.wav` files and the percentile of its
/// loudness distribution every clip is normalized to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub directory: PathBuf,
    /// Percentile in `[0, 1]`; `0.5` is the median.
    pub percentile: f64,
    /// Cut every picked clip to a random window of this many milliseconds
    /// before normalizing; shorter clips are used whole.
    pub segment_ms: Option<u64>,
    /// `None` disables silence masking for this source.
    pub silence: Option<SilenceConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            percentile: 0.5,
            segment_ms: None,
            silence: None,
        }
    }
}

impl SourceConfig {
    pub fn new(directory: impl Into<PathBuf>, percentile: f64) -> Self {
        Self {
            directory: directory.into(),
            percentile,
            segment_ms: None,
            silence: None,
        }
    }

    pub fn segment_step(&self) -> Option<RandomSegment> {
        self.segment_ms.map(|length_ms| RandomSegment { length_ms })
    }
}

// ---------------------------------------------------------------------------
// FormatConfig
// ---------------------------------------------------------------------------

/// Optional conversion of every loaded clip before mixing.
///
/// Both fields `None` (the default) means no conversion: sources with
/// different formats are rejected instead of silently mis-mixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl FormatConfig {
    pub fn is_passthrough(&self) -> bool {
        self.sample_rate.is_none() && self.channels.is_none()
    }
}

// ---------------------------------------------------------------------------
// BenchmarkConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level run configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use sound_merge::config::BenchmarkConfig;
///
/// // Load (returns Default when file is missing)
/// let config = BenchmarkConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// How each fold picks the level the running mix is retargeted to.
    pub distribution: DistributionMode,
    /// Length of every generated file, in seconds.
    pub target_duration_secs: f64,
    /// Number of output slots.
    pub file_count: usize,
    /// Output directory for `audio{slot}.wav` and `manifest.json`.
    pub destination: PathBuf,
    /// Run seed; `None` draws one from the OS at start-up.
    pub seed: Option<u64>,
    /// Fixed loudness for every finished mix.
    pub final_dbfs: Option<f64>,
    /// Crossfade used when extending short clips.
    pub crossfade_ms: u64,
    /// Extension clips drawn before duration fitting gives up.
    pub max_fit_attempts: usize,
    /// Extra attempts per slot after a failure.
    pub retries: usize,
    /// Slots generated in parallel (`1` = sequential).
    pub workers: usize,
    pub write_manifest: bool,
    pub format: FormatConfig,
    /// Input corpora, mixed in this order.
    pub sources: Vec<SourceConfig>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            distribution: DistributionMode::default(),
            target_duration_secs: 10.0,
            file_count: 10,
            destination: PathBuf::from("output"),
            seed: None,
            final_dbfs: None,
            crossfade_ms: 100,
            max_fit_attempts: 32,
            retries: 2,
            workers: 1,
            write_manifest: true,
            format: FormatConfig::default(),
            sources: vec![
                SourceConfig::new("data/speech", 0.5),
                SourceConfig::new("data/music", 0.5),
            ],
        }
    }
}

impl BenchmarkConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(BenchmarkConfig::default())` when the file does not exist
    /// yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Target duration rounded to whole milliseconds.
    pub fn target_duration_ms(&self) -> u64 {
        (self.target_duration_secs * 1_000.0).round() as u64
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |msg: String| -> crate::error::Result<()> {
            Err(MergeError::InvalidArgument(msg))
        };

        if self.sources.is_empty() {
            return invalid("at least one source directory is required".into());
        }
        for source in &self.sources {
            if !(0.0..=1.0).contains(&source.percentile) {
                return invalid(format!(
                    "percentile {} for {} is outside [0, 1]",
                    source.percentile,
                    source.directory.display()
                ));
            }
            if source.segment_ms == Some(0) {
                return invalid(format!(
                    "segment length for {} must be > 0 ms",
                    source.directory.display()
                ));
            }
            if let Some(silence) = &source.silence {
                if silence.interval_ms == 0 {
                    return invalid(format!(
                        "silence interval for {} must be > 0 ms",
                        source.directory.display()
                    ));
                }
            }
        }
        if !self.target_duration_secs.is_finite() || self.target_duration_ms() == 0 {
            return invalid(format!(
                "target duration {} s must be at least 1 ms",
                self.target_duration_secs
            ));
        }
        if self.file_count == 0 {
            return invalid("file count must be > 0".into());
        }
        if self.max_fit_attempts == 0 {
            return invalid("max_fit_attempts must be > 0".into());
        }
        if self.workers == 0 {
            return invalid("workers must be > 0".into());
        }
        if let Some(db) = self.final_dbfs {
            if !db.is_finite() {
                return invalid(format!("final_dbfs {db} is not a finite level"));
            }
        }
        if self.format.sample_rate == Some(0) || self.format.channels == Some(0) {
            return invalid("format overrides must be > 0".into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
