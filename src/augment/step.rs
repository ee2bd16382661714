//! Statically typed augmentation steps.
//!
//! Every stage of the per-source chain is an [`AugmentStep`] object that owns
//! its own configuration and maps one [`SampleBuffer`] to a new one.  A
//! [`StepChain`] applies its steps in insertion order.
//!
//! ```rust
//! use rand::{rngs::StdRng, SeedableRng};
//! use sound_merge::audio::{AudioSpec, SampleBuffer};
//! use sound_merge::augment::{Attenuate, Normalize, StepChain};
//!
//! let spec = AudioSpec::new(1, 8_000, 16);
//! let clip = SampleBuffer::from_normalized(&[0.1, -0.2, 0.3, -0.1], spec).unwrap();
//!
//! let chain = StepChain::new()
//!     .then(Normalize { target_dbfs: -20.0 })
//!     .then(Attenuate { coefficient: 0.5 });
//!
//! let out = chain.apply(&clip, &mut StdRng::seed_from_u64(0)).unwrap();
//! assert!((out.dbfs() - (-23.01)).abs() < 0.05);
//! ```

use rand::rngs::StdRng;

use crate::audio::SampleBuffer;
use crate::error::Result;
use crate::loudness::{apply_gain_db, coefficient_to_db_loss, normalize};

use super::fit::{fit_to_duration, ClipSource};
use super::segment::random_segment;
use super::silence::random_silence_mask;

// ---------------------------------------------------------------------------
// AugmentStep trait
// ---------------------------------------------------------------------------

/// One buffer → buffer stage of the augmentation chain.
pub trait AugmentStep {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Produce the augmented copy of `buffer`.
    fn apply(&self, buffer: &SampleBuffer, rng: &mut StdRng) -> Result<SampleBuffer>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AugmentStep>) {}
};

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Shift loudness to a fixed dBFS level.
#[derive(Debug, Clone, Copy)]
pub struct Normalize {
    pub target_dbfs: f64,
}

impl AugmentStep for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn apply(&self, buffer: &SampleBuffer, _rng: &mut StdRng) -> Result<SampleBuffer> {
        normalize(buffer, self.target_dbfs)
    }
}

/// Attenuate by the dB loss of a mix weight in `(0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct Attenuate {
    pub coefficient: f64,
}

impl AugmentStep for Attenuate {
    fn name(&self) -> &'static str {
        "attenuate"
    }

    fn apply(&self, buffer: &SampleBuffer, _rng: &mut StdRng) -> Result<SampleBuffer> {
        apply_gain_db(buffer, coefficient_to_db_loss(self.coefficient)?)
    }
}

/// Trim or crossfade-extend to an exact duration.
pub struct FitDuration<'a> {
    pub target_ms: u64,
    pub crossfade_ms: u64,
    pub max_attempts: usize,
    pub pool: &'a dyn ClipSource,
}

impl AugmentStep for FitDuration<'_> {
    fn name(&self) -> &'static str {
        "fit-duration"
    }

    fn apply(&self, buffer: &SampleBuffer, rng: &mut StdRng) -> Result<SampleBuffer> {
        fit_to_duration(
            buffer,
            self.target_ms,
            self.crossfade_ms,
            self.pool,
            self.max_attempts,
            rng,
        )
    }
}

/// Random silence windows with fades.
#[derive(Debug, Clone, Copy)]
pub struct SilenceMask {
    pub total_ms: u64,
    pub interval_ms: u64,
    pub fade_ms: u64,
}

impl AugmentStep for SilenceMask {
    fn name(&self) -> &'static str {
        "silence-mask"
    }

    fn apply(&self, buffer: &SampleBuffer, rng: &mut StdRng) -> Result<SampleBuffer> {
        random_silence_mask(buffer, self.total_ms, self.interval_ms, self.fade_ms, rng)
    }
}

/// Random window of fixed length.
#[derive(Debug, Clone, Copy)]
pub struct RandomSegment {
    pub length_ms: u64,
}

impl AugmentStep for RandomSegment {
    fn name(&self) -> &'static str {
        "random-segment"
    }

    fn apply(&self, buffer: &SampleBuffer, rng: &mut StdRng) -> Result<SampleBuffer> {
        random_segment(buffer, self.length_ms, rng)
    }
}

// ---------------------------------------------------------------------------
// StepChain
// ---------------------------------------------------------------------------

/// Ordered list of steps applied one after another.
#[derive(Default)]
pub struct StepChain<'a> {
    steps: Vec<Box<dyn AugmentStep + 'a>>,
}

impl<'a> StepChain<'a> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append `step` and return the chain (builder style).
    pub fn then(mut self, step: impl AugmentStep + 'a) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: Box<dyn AugmentStep + 'a>) {
        self.steps.push(step);
    }

    /// Step names in application order.
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order; the input is left untouched.
    pub fn apply(&self, buffer: &SampleBuffer, rng: &mut StdRng) -> Result<SampleBuffer> {
        let mut current = buffer.clone();
        for step in &self.steps {
            current = step.apply(&current, rng)?;
            log::debug!("step {}: {current} @ {:.2} dBFS", step.name(), current.dbfs());
        }
        Ok(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSpec;
    use crate::augment::BufferPool;
    use crate::error::MergeError;
    use crate::test_support::tone;
    use rand::SeedableRng;

    fn spec() -> AudioSpec {
        AudioSpec::new(1, 8_000, 16)
    }

    #[test]
    fn empty_chain_is_identity() {
        let clip = tone(200.0, 0.1, 0.3, spec());
        let out = StepChain::new().apply(&clip, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(out, clip);
    }

    #[test]
    fn steps_run_in_insertion_order() {
        let clip = tone(200.0, 1.0, 0.3, spec());
        let pool = BufferPool::default();
        let chain = StepChain::new()
            .then(Normalize { target_dbfs: -18.0 })
            .then(FitDuration {
                target_ms: 500,
                crossfade_ms: 10,
                max_attempts: 4,
                pool: &pool,
            })
            .then(SilenceMask {
                total_ms: 100,
                interval_ms: 50,
                fade_ms: 5,
            });
        assert_eq!(chain.names(), vec!["normalize", "fit-duration", "silence-mask"]);

        let out = chain.apply(&clip, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(out.frames(), 4_000);
        assert!(out.samples().iter().filter(|&&s| s == 0).count() >= 800);
    }

    #[test]
    fn failing_step_stops_the_chain() {
        let silent = SampleBuffer::silent(spec(), 100).unwrap();
        let chain = StepChain::new()
            .then(Normalize { target_dbfs: -18.0 })
            .then(RandomSegment { length_ms: 5 });
        let err = chain.apply(&silent, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, MergeError::SilentBuffer));
    }

    #[test]
    fn attenuate_rejects_zero_weight() {
        let clip = tone(200.0, 0.1, 0.3, spec());
        let err = Attenuate { coefficient: 0.0 }
            .apply(&clip, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidArgument(_)));
    }
}
