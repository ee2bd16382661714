//! Run phase state machine and shared progress.
//!
//! [`RunPhase`] tracks where a benchmark run is.  Workers update it through
//! [`SharedProgress`]; the CLI polls it for periodic progress lines.
//!
//! [`SharedProgress`] is a type alias for `Arc<Mutex<RunProgress>>`, cheap to
//! clone and safe to share across threads.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// RunPhase
// ---------------------------------------------------------------------------

/// Phases of one benchmark run.
///
/// ```text
/// Idle ──prepare──▶ Scanning ──corpora cached──▶ Generating
///                                                  ├─ all slots done ──▶ Finished
///                                                  └─ cancel flag    ──▶ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing started yet.
    Idle,

    /// Source directories are being scanned and measured.
    Scanning,

    /// Output slots are being mixed and written.
    Generating,

    /// Every slot was attempted.
    Finished,

    /// Scheduling stopped early; in-flight slots were allowed to finish.
    Cancelled,
}

impl RunPhase {
    /// Returns `true` while the run is doing work.
    ///
    /// ```
    /// use sound_merge::pipeline::RunPhase;
    ///
    /// assert!(!RunPhase::Idle.is_busy());
    /// assert!(RunPhase::Scanning.is_busy());
    /// assert!(RunPhase::Generating.is_busy());
    /// assert!(!RunPhase::Finished.is_busy());
    /// assert!(!RunPhase::Cancelled.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, RunPhase::Scanning | RunPhase::Generating)
    }

    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            RunPhase::Idle => "Idle",
            RunPhase::Scanning => "Scanning",
            RunPhase::Generating => "Generating",
            RunPhase::Finished => "Done",
            RunPhase::Cancelled => "Cancelled",
        }
    }
}

impl Default for RunPhase {
    fn default() -> Self {
        RunPhase::Idle
    }
}

// ---------------------------------------------------------------------------
// RunProgress
// ---------------------------------------------------------------------------

/// Progress counters of the current run.
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    pub phase: RunPhase,

    /// Slots the run was asked for.
    pub total_slots: usize,

    /// Slots written so far.
    pub written: usize,

    /// Slots given up on after exhausting their retries.
    pub skipped: usize,

    /// Most recently written file.
    pub last_output: Option<PathBuf>,
}

impl RunProgress {
    /// Slots finished one way or the other.
    pub fn attempted(&self) -> usize {
        self.written + self.skipped
    }

    /// Fraction of slots attempted, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_slots == 0 {
            return 0.0;
        }
        self.attempted() as f64 / self.total_slots as f64
    }

    /// `true` once generation has ended, whether finished or cancelled.
    pub fn is_over(&self) -> bool {
        matches!(self.phase, RunPhase::Finished | RunPhase::Cancelled)
    }

    /// One-line summary for periodic progress logs.
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "{} {}/{} ({:.0}%)",
            self.phase.label(),
            self.attempted(),
            self.total_slots,
            self.fraction() * 100.0
        );
        if self.skipped > 0 {
            line.push_str(&format!(", {} skipped", self.skipped));
        }
        if let Some(path) = &self.last_output {
            line.push_str(&format!(", last {}", path.display()));
        }
        line
    }
}

// ---------------------------------------------------------------------------
// SharedProgress
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`RunProgress`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedProgress = Arc<Mutex<RunProgress>>;

/// Construct a new [`SharedProgress`] in the `Idle` phase.
pub fn new_shared_progress() -> SharedProgress {
    Arc::new(Mutex::new(RunProgress::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
