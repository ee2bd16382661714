//! Randomized augmentation operations and the step interface that chains
//! them.
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`fit_to_duration`] | trim to a random window, or crossfade-extend from a pool |
//! | [`random_silence_mask`] | silence whole intervals at random, with fades |
//! | [`random_segment`] | random contiguous window of exact length |

pub mod fit;
pub mod segment;
pub mod silence;
pub mod step;

pub use fit::{append_with_crossfade, fit_to_duration, BufferPool, ClipSource, LeveledSource};
pub use segment::random_segment;
pub use silence::{plan_silence_windows, random_silence_mask};
pub use step::{
    Attenuate, AugmentStep, FitDuration, Normalize, RandomSegment, SilenceMask, StepChain,
};
