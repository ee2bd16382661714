//! Mixing: overlay with peak limiting, target-level selection and the
//! N-source fold engine.

pub mod engine;
pub mod overlay;
pub mod volume;

pub use engine::{FoldRecord, MixEngine, MixOutcome, MixPlan, MixSource, MixStage};
pub use overlay::overlay;
pub use volume::{choose_final_volume, DistributionMode};
