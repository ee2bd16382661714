//! N-source mixing state machine.
//!
//! ```text
//! Init ──▶ PerSourceAugment ──▶ FoldMix ──▶ FinalNormalize ──▶ Done
//!  │             │                 │              │
//!  silent        segment,          overlay each   optional fixed
//!  canvas        normalize, fit,   source in      target dBFS
//!                mask, attenuate   order, retarget
//! ```
//!
//! Folding is order-sensitive: the first source is normalized back to its own
//! level by the first retarget, and the peak limiter makes later folds
//! non-commutative.  Sources are always folded in plan order.

use rand::rngs::StdRng;
use serde::Serialize;

use crate::audio::SampleBuffer;
use crate::augment::{
    Attenuate, AugmentStep, ClipSource, FitDuration, LeveledSource, Normalize, RandomSegment,
    SilenceMask, StepChain,
};
use crate::error::{MergeError, Result};
use crate::loudness::normalize;

use super::overlay::overlay;
use super::volume::{choose_final_volume, DistributionMode};

// ---------------------------------------------------------------------------
// MixStage
// ---------------------------------------------------------------------------

/// Stages of one mix, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixStage {
    /// Plan validated, silent canvas allocated.
    Init,
    /// Every source normalized, fitted, masked and attenuated.
    PerSourceAugment,
    /// Sources overlaid onto the canvas one by one.
    FoldMix,
    /// Optional terminal normalization.
    FinalNormalize,
    Done,
}

impl MixStage {
    pub fn label(&self) -> &'static str {
        match self {
            MixStage::Init => "Init",
            MixStage::PerSourceAugment => "PerSourceAugment",
            MixStage::FoldMix => "FoldMix",
            MixStage::FinalNormalize => "FinalNormalize",
            MixStage::Done => "Done",
        }
    }
}

// ---------------------------------------------------------------------------
// MixPlan
// ---------------------------------------------------------------------------

/// One source of a [`MixPlan`].
pub struct MixSource<'a> {
    /// Name used in log lines and fold records (usually the file name).
    pub label: String,
    pub buffer: SampleBuffer,
    /// Corpus reference loudness the source is normalized to.
    pub reference_dbfs: f64,
    /// Mix weight in `(0, 1]`.
    pub coefficient: f64,
    /// Cut a random window of this length before normalizing; skipped for
    /// clips that are not longer.
    pub segment: Option<RandomSegment>,
    pub silence: Option<SilenceMask>,
    /// Where duration fitting draws extension clips from.
    pub pool: &'a dyn ClipSource,
}

/// Everything one mix needs.  Built per output file and consumed by
/// [`MixEngine::run`].
pub struct MixPlan<'a> {
    pub sources: Vec<MixSource<'a>>,
    pub target_duration_ms: u64,
    pub distribution: DistributionMode,
    /// Fixed loudness for the finished mix; `None` keeps the folded level.
    pub final_dbfs: Option<f64>,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Loudness bookkeeping for one fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldRecord {
    pub source: String,
    pub coefficient: f64,
    /// Source level after fitting and masking, before attenuation.
    pub source_dbfs: f64,
    pub attenuated_dbfs: f64,
    /// Canvas level before this source was overlaid.
    pub canvas_dbfs: f64,
    /// Level the mix was retargeted to.
    pub target_dbfs: f64,
}

#[derive(Debug, Clone)]
pub struct MixOutcome {
    pub buffer: SampleBuffer,
    pub folds: Vec<FoldRecord>,
    pub final_dbfs: f64,
    /// Stages visited, in order.
    pub stages: Vec<MixStage>,
}

// ---------------------------------------------------------------------------
// MixEngine
// ---------------------------------------------------------------------------

struct Augmented {
    buffer: SampleBuffer,
    level_dbfs: f64,
}

/// Runs [`MixPlan`]s.
#[derive(Debug, Clone, Copy)]
pub struct MixEngine {
    crossfade_ms: u64,
    max_fit_attempts: usize,
}

impl MixEngine {
    pub fn new(crossfade_ms: u64, max_fit_attempts: usize) -> Self {
        Self {
            crossfade_ms,
            max_fit_attempts,
        }
    }

    /// Mix every source of `plan` onto a fresh canvas.
    ///
    /// # Errors
    ///
    /// * [`MergeError::InvalidArgument`]: no sources, zero duration, a bad
    ///   coefficient, or a fold with no finite loudness to target.
    /// * [`MergeError::IncompatibleFormat`]: sources differ in format.
    /// * Anything the augmentation steps report (silent source, fitting
    ///   timeout, …).
    pub fn run(&self, plan: &MixPlan<'_>, rng: &mut StdRng) -> Result<MixOutcome> {
        let mut stages = Vec::with_capacity(5);

        // ---- Init ----
        stages.push(MixStage::Init);
        let first = plan
            .sources
            .first()
            .ok_or_else(|| MergeError::InvalidArgument("a mix needs at least one source".into()))?;
        if plan.target_duration_ms == 0 {
            return Err(MergeError::InvalidArgument("target duration must be > 0 ms".into()));
        }
        for source in &plan.sources[1..] {
            first.buffer.ensure_compatible(&source.buffer)?;
        }
        let spec = first.buffer.spec();
        let mut canvas = SampleBuffer::silent(spec, spec.ms_to_frames(plan.target_duration_ms))?;

        // ---- PerSourceAugment ----
        stages.push(MixStage::PerSourceAugment);
        let mut augmented = Vec::with_capacity(plan.sources.len());
        for source in &plan.sources {
            // Extension clips are leveled like the source itself.
            let leveled = LeveledSource::new(source.pool, source.reference_dbfs);
            let mut chain = StepChain::new();
            if let Some(segment) = source.segment {
                if source.buffer.duration_ms() > segment.length_ms {
                    chain.push(Box::new(segment));
                }
            }
            chain = chain
                .then(Normalize {
                    target_dbfs: source.reference_dbfs,
                })
                .then(FitDuration {
                    target_ms: plan.target_duration_ms,
                    crossfade_ms: self.crossfade_ms,
                    max_attempts: self.max_fit_attempts,
                    pool: &leveled,
                });
            if let Some(mask) = source.silence {
                chain = chain.then(mask);
            }
            let shaped = chain.apply(&source.buffer, rng)?;
            let level_dbfs = shaped.dbfs();
            let buffer = Attenuate {
                coefficient: source.coefficient,
            }
            .apply(&shaped, rng)?;
            augmented.push(Augmented { buffer, level_dbfs });
        }

        // ---- FoldMix ----
        stages.push(MixStage::FoldMix);
        let mut folds = Vec::with_capacity(augmented.len());
        for (source, aug) in plan.sources.iter().zip(&augmented) {
            let canvas_dbfs = canvas.dbfs();
            let mixed = overlay(&canvas, &aug.buffer, 0)?;
            let target_dbfs =
                choose_final_volume(&[canvas_dbfs, aug.level_dbfs], plan.distribution, rng)?;
            canvas = normalize(&mixed, target_dbfs)?;

            log::debug!(
                "fold {}: coefficient {:.3}, source {:.2} dBFS → {:.2} dBFS attenuated, \
                 canvas {:.2} dBFS, target {:.2} dBFS",
                source.label,
                source.coefficient,
                aug.level_dbfs,
                aug.buffer.dbfs(),
                canvas_dbfs,
                target_dbfs
            );
            folds.push(FoldRecord {
                source: source.label.clone(),
                coefficient: source.coefficient,
                source_dbfs: aug.level_dbfs,
                attenuated_dbfs: aug.buffer.dbfs(),
                canvas_dbfs,
                target_dbfs,
            });
        }

        // ---- FinalNormalize ----
        stages.push(MixStage::FinalNormalize);
        if let Some(target) = plan.final_dbfs {
            canvas = normalize(&canvas, target)?;
        }

        stages.push(MixStage::Done);
        let final_dbfs = canvas.dbfs();
        Ok(MixOutcome {
            buffer: canvas,
            folds,
            final_dbfs,
            stages,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
