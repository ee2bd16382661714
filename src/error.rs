//! Error taxonomy shared by every stage of the mixing pipeline.
//!
//! Each variant carries a human-readable description so the orchestrator can
//! log a failed slot without knowing which stage produced it.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading, measuring, augmenting or mixing
/// audio.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A percent, coefficient, percentile, mode or other argument is out of
    /// range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A corpus (directory or buffer list) has no usable audio.
    #[error("empty corpus: {0}")]
    EmptyCorpus(String),

    /// The buffer is shorter than a requested segment.
    #[error("insufficient length: need {needed_frames} frames, have {available_frames}")]
    InsufficientLength {
        needed_frames: usize,
        available_frames: usize,
    },

    /// Duration fitting drew `attempts` clips without reaching the target.
    #[error(
        "duration fitting did not converge after {attempts} clips \
         ({reached_frames} of {target_frames} frames)"
    )]
    FittingTimeout {
        attempts: usize,
        reached_frames: usize,
        target_frames: usize,
    },

    /// Loudness normalization is undefined for a zero-RMS buffer.
    #[error("cannot normalize a silent buffer")]
    SilentBuffer,

    /// Slice bounds fall outside the buffer.
    #[error("range {start}..{end} out of bounds for buffer of {len} frames")]
    Range { start: usize, end: usize, len: usize },

    /// Two buffers differ in sample rate, channel count or bit depth.
    #[error("incompatible formats: {left} vs {right}")]
    IncompatibleFormat { left: String, right: String },

    /// WAV container could not be read or written.
    #[error("wav error for {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// Filesystem access failed.
    #[error("i/o error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run manifest could not be serialised.
    #[error("manifest error for {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A worker task panicked or was aborted.
    #[error("worker failed: {0}")]
    Worker(String),
}

impl MergeError {
    /// Returns `true` for failures that make every slot of a run fail, so
    /// retrying the slot is pointless.
    pub fn is_corpus_level(&self) -> bool {
        matches!(self, MergeError::EmptyCorpus(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_error_display_is_informative() {
        let err = MergeError::Range {
            start: 10,
            end: 20,
            len: 15,
        };
        let msg = err.to_string();
        assert!(msg.contains("10..20"), "message: {msg}");
        assert!(msg.contains("15"), "message: {msg}");
    }

    #[test]
    fn only_empty_corpus_is_corpus_level() {
        assert!(MergeError::EmptyCorpus("dir".into()).is_corpus_level());
        assert!(!MergeError::SilentBuffer.is_corpus_level());
        assert!(!MergeError::InvalidArgument("x".into()).is_corpus_level());
    }
}
