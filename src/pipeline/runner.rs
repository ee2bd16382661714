//! Benchmark orchestrator: scans corpora once, then mixes and writes every
//! output slot.
//!
//! [`BenchmarkOrchestrator`] owns the cached corpora and the run seed.  Each
//! slot gets its own `StdRng` derived from `(run seed, slot, attempt)`, so a
//! slot's output does not depend on which worker ran it or in what order.
//!
//! # Slot flow
//!
//! ```text
//! slot k, attempt a
//!   └─▶ StdRng::seed_from_u64(slot_seed(run, k, a))
//!         └─▶ per source: pick file, load, conform, draw coefficient
//!               └─▶ MixEngine::run ──▶ save_audio(audio{k}.wav)
//!                     ├─ Ok                → SlotRecord
//!                     ├─ Err (corpus-level) → abort the run
//!                     └─ Err (other)        → warn, retry with attempt a+1
//!                                             or skip the slot
//! ```
//!
//! Mixing is CPU-bound, so the concurrent path runs slots on
//! `tokio::task::spawn_blocking`, bounded by a semaphore.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::Semaphore;

use crate::audio::{conform, load_audio, save_audio, SampleBuffer};
use crate::augment::ClipSource;
use crate::config::{BenchmarkConfig, FormatConfig};
use crate::error::{MergeError, Result};
use crate::loudness::{random_coefficient, Corpus};
use crate::mix::{MixEngine, MixPlan, MixSource};

use super::manifest::{Manifest, SlotRecord, SourceSummary};
use super::state::{new_shared_progress, RunPhase, RunProgress, SharedProgress};

// ---------------------------------------------------------------------------
// CorpusPool
// ---------------------------------------------------------------------------

/// A scanned corpus that serves clips in the run's output format.
///
/// Files are loaded lazily on every draw; only the file list and the
/// loudness reference stay in memory.
#[derive(Debug, Clone)]
pub struct CorpusPool {
    corpus: Corpus,
    format: FormatConfig,
}

impl CorpusPool {
    pub fn new(corpus: Corpus, format: FormatConfig) -> Self {
        Self { corpus, format }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Pick one file uniformly, load it and apply the format conversion.
    pub fn pick(&self, rng: &mut StdRng) -> Result<(PathBuf, SampleBuffer)> {
        let path = self.corpus.files().choose(rng).ok_or_else(|| {
            MergeError::EmptyCorpus(format!("no usable files in {}", self.corpus.directory().display()))
        })?;
        let clip = load_audio(path)?;
        let clip = if self.format.is_passthrough() {
            clip
        } else {
            conform(&clip, self.format.channels, self.format.sample_rate)?
        };
        Ok((path.clone(), clip))
    }
}

impl ClipSource for CorpusPool {
    fn draw(&self, rng: &mut StdRng) -> Result<SampleBuffer> {
        self.pick(rng).map(|(_, clip)| clip)
    }
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Result of one `generate*` call.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub seed: u64,
    /// Written slots, ordered by slot index.
    pub slots: Vec<SlotRecord>,
    /// Slots given up on after their retries.
    pub skipped: Vec<usize>,
    pub cancelled: bool,
    pub manifest: Option<PathBuf>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.slots.len()
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Derive the seed of one slot attempt from the run seed (splitmix64
/// finalizer over the combined inputs).
pub fn slot_seed(run_seed: u64, slot: usize, attempt: usize) -> u64 {
    let mut z = run_seed
        .wrapping_add((slot as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add((attempt as u64).wrapping_mul(0xD1B5_4A32_D192_ED03));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ---------------------------------------------------------------------------
// BenchmarkOrchestrator
// ---------------------------------------------------------------------------

/// Drives a whole benchmark run.
///
/// ```rust,no_run
/// use sound_merge::config::{BenchmarkConfig, SourceConfig};
/// use sound_merge::pipeline::BenchmarkOrchestrator;
///
/// let config = BenchmarkConfig {
///     sources: vec![
///         SourceConfig::new("data/speech", 0.5),
///         SourceConfig::new("data/music", 0.9),
///     ],
///     file_count: 100,
///     ..BenchmarkConfig::default()
/// };
///
/// let orchestrator = BenchmarkOrchestrator::prepare(config, Some(42)).unwrap();
/// let report = orchestrator.generate().unwrap();
/// println!("{} files written, {} skipped", report.written(), report.skipped.len());
/// ```
pub struct BenchmarkOrchestrator {
    config: BenchmarkConfig,
    pools: Vec<CorpusPool>,
    engine: MixEngine,
    seed: u64,
    progress: SharedProgress,
}

impl BenchmarkOrchestrator {
    /// Validate `config`, scan every source directory once and cache its
    /// loudness reference.
    ///
    /// `seed` overrides `config.seed`; with neither, a seed is drawn from the
    /// OS and logged so the run can be repeated.
    ///
    /// # Errors
    ///
    /// Invalid settings, or any directory that cannot be scanned or has no
    /// usable file ([`MergeError::EmptyCorpus`]).  Nothing is generated in
    /// that case.
    pub fn prepare(config: BenchmarkConfig, seed: Option<u64>) -> Result<Self> {
        Self::prepare_with_progress(config, seed, new_shared_progress())
    }

    /// Like [`prepare`](Self::prepare), reporting into an existing
    /// [`SharedProgress`].
    pub fn prepare_with_progress(
        config: BenchmarkConfig,
        seed: Option<u64>,
        progress: SharedProgress,
    ) -> Result<Self> {
        config.validate()?;
        let seed = seed.or(config.seed).unwrap_or_else(rand::random);
        log::info!("run seed {seed}");

        lock(&progress).phase = RunPhase::Scanning;

        let mut pools = Vec::with_capacity(config.sources.len());
        for source in &config.sources {
            let corpus = Corpus::scan(&source.directory, source.percentile)?;
            pools.push(CorpusPool::new(corpus, config.format));
        }

        lock(&progress).phase = RunPhase::Idle;

        Ok(Self {
            engine: MixEngine::new(config.crossfade_ms, config.max_fit_attempts),
            config,
            pools,
            seed,
            progress,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn pools(&self) -> &[CorpusPool] {
        &self.pools
    }

    pub fn progress(&self) -> SharedProgress {
        Arc::clone(&self.progress)
    }

    /// Path of the file written for `slot`.
    pub fn output_path(&self, slot: usize) -> PathBuf {
        self.config.destination.join(format!("audio{slot}.wav"))
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Generate every slot sequentially.
    pub fn generate(&self) -> Result<RunReport> {
        self.generate_with_cancel(&AtomicBool::new(false))
    }

    /// Generate sequentially, checking `cancel` before each slot.
    pub fn generate_with_cancel(&self, cancel: &AtomicBool) -> Result<RunReport> {
        self.begin_generating()?;

        let mut slots = Vec::new();
        let mut skipped = Vec::new();
        let mut cancelled = false;
        for slot in 0..self.config.file_count {
            if cancel.load(Ordering::SeqCst) {
                log::warn!("cancelled before slot {slot}");
                cancelled = true;
                break;
            }
            match self.run_slot(slot) {
                Ok(Some(record)) => slots.push(record),
                Ok(None) => skipped.push(slot),
                Err(e) => return Err(self.abort(e)),
            }
        }

        self.finish(slots, skipped, cancelled)
    }

    /// Generate with up to `workers` slots in flight on tokio's blocking
    /// pool.
    ///
    /// Raising `cancel` stops scheduling new slots; slots already running
    /// are completed and reported.  A corpus-level failure in any slot stops
    /// scheduling too and is returned once in-flight slots are done.
    pub async fn generate_concurrent(
        self: Arc<Self>,
        workers: usize,
        cancel: Arc<AtomicBool>,
    ) -> Result<RunReport> {
        self.begin_generating()?;

        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let fatal = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(self.config.file_count);
        let mut cancelled = false;

        for slot in 0..self.config.file_count {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| MergeError::Worker(e.to_string()))?;
            if fatal.load(Ordering::SeqCst) {
                break;
            }
            if cancel.load(Ordering::SeqCst) {
                log::warn!("cancelled before slot {slot}");
                cancelled = true;
                break;
            }

            let this = Arc::clone(&self);
            let fatal = Arc::clone(&fatal);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let result = this.run_slot(slot);
                if result.is_err() {
                    fatal.store(true, Ordering::SeqCst);
                }
                (slot, result)
            }));
        }

        let mut slots = Vec::new();
        let mut skipped = Vec::new();
        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok((_, Ok(Some(record)))) => slots.push(record),
                Ok((slot, Ok(None))) => skipped.push(slot),
                Ok((_, Err(e))) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(MergeError::Worker(e.to_string()));
                }
            }
        }

        if let Some(e) = first_error {
            return Err(self.abort(e));
        }
        self.finish(slots, skipped, cancelled)
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    /// Run one slot with retries.  `Ok(None)` means the slot was skipped.
    fn run_slot(&self, slot: usize) -> Result<Option<SlotRecord>> {
        let attempts = self.config.retries + 1;
        for attempt in 0..attempts {
            let seed = slot_seed(self.seed, slot, attempt);
            let mut rng = StdRng::seed_from_u64(seed);
            match self.mix_slot(slot, attempt, seed, &mut rng) {
                Ok(record) => {
                    let mut progress = lock(&self.progress);
                    progress.written += 1;
                    progress.last_output = Some(record.path.clone());
                    return Ok(Some(record));
                }
                Err(e) if e.is_corpus_level() => return Err(e),
                Err(e) => log::warn!("slot {slot}: attempt {}/{attempts} failed: {e}", attempt + 1),
            }
        }

        log::warn!("slot {slot}: skipped after {attempts} attempt(s)");
        lock(&self.progress).skipped += 1;
        Ok(None)
    }

    fn mix_slot(&self, slot: usize, attempt: usize, seed: u64, rng: &mut StdRng) -> Result<SlotRecord> {
        let mut files = Vec::with_capacity(self.pools.len());
        let mut sources = Vec::with_capacity(self.pools.len());
        for (pool, source) in self.pools.iter().zip(&self.config.sources) {
            let (path, buffer) = pool.pick(rng)?;
            let coefficient = random_coefficient(rng);
            sources.push(MixSource {
                label: file_label(&path),
                buffer,
                reference_dbfs: pool.corpus().reference_db(),
                coefficient,
                segment: source.segment_step(),
                silence: source.silence.as_ref().map(|s| s.to_step()),
                pool,
            });
            files.push(path);
        }

        let plan = MixPlan {
            sources,
            target_duration_ms: self.config.target_duration_ms(),
            distribution: self.config.distribution,
            final_dbfs: self.config.final_dbfs,
        };
        let outcome = self.engine.run(&plan, rng)?;

        let path = self.output_path(slot);
        save_audio(&outcome.buffer, &path)?;

        let picks: Vec<String> = plan
            .sources
            .iter()
            .map(|s| format!("{} ×{:.3}", s.label, s.coefficient))
            .collect();
        let levels: Vec<String> = outcome
            .folds
            .iter()
            .map(|f| format!("{:.2}", f.target_dbfs))
            .collect();
        log::info!(
            "slot {slot}: [{}] folds [{}] dBFS → {} @ {:.2} dBFS",
            picks.join(", "),
            levels.join(", "),
            path.display(),
            outcome.final_dbfs
        );

        Ok(SlotRecord {
            slot,
            path,
            attempt,
            seed,
            files,
            folds: outcome.folds,
            final_dbfs: outcome.final_dbfs,
        })
    }

    // -----------------------------------------------------------------------
    // Run bookkeeping
    // -----------------------------------------------------------------------

    fn begin_generating(&self) -> Result<()> {
        let dest = &self.config.destination;
        std::fs::create_dir_all(dest).map_err(|source| MergeError::Io {
            path: dest.clone(),
            source,
        })?;

        let mut progress = lock(&self.progress);
        *progress = RunProgress {
            phase: RunPhase::Generating,
            total_slots: self.config.file_count,
            ..RunProgress::default()
        };
        log::info!(
            "generating {} file(s) of {} ms into {}",
            self.config.file_count,
            self.config.target_duration_ms(),
            dest.display()
        );
        Ok(())
    }

    fn finish(&self, slots: Vec<SlotRecord>, skipped: Vec<usize>, cancelled: bool) -> Result<RunReport> {
        let manifest = if self.config.write_manifest {
            Some(self.manifest(&slots, &skipped, cancelled).write_to(&self.config.destination)?)
        } else {
            None
        };

        lock(&self.progress).phase = if cancelled {
            RunPhase::Cancelled
        } else {
            RunPhase::Finished
        };
        log::info!(
            "run {}: {} written, {} skipped",
            if cancelled { "cancelled" } else { "finished" },
            slots.len(),
            skipped.len()
        );

        Ok(RunReport {
            seed: self.seed,
            slots,
            skipped,
            cancelled,
            manifest,
        })
    }

    fn abort(&self, error: MergeError) -> MergeError {
        log::error!("run aborted: {error}");
        lock(&self.progress).phase = RunPhase::Cancelled;
        error
    }

    fn manifest(&self, slots: &[SlotRecord], skipped: &[usize], cancelled: bool) -> Manifest {
        Manifest {
            seed: self.seed,
            distribution: self.config.distribution,
            target_duration_ms: self.config.target_duration_ms(),
            final_dbfs: self.config.final_dbfs,
            sources: self
                .pools
                .iter()
                .zip(&self.config.sources)
                .map(|(pool, source)| SourceSummary {
                    directory: source.directory.clone(),
                    percentile: source.percentile,
                    reference_dbfs: pool.corpus().reference_db(),
                    usable_files: pool.corpus().files().len(),
                })
                .collect(),
            slots: slots.to_vec(),
            skipped: skipped.to_vec(),
            cancelled,
        }
    }
}

fn lock(progress: &SharedProgress) -> std::sync::MutexGuard<'_, RunProgress> {
    progress.lock().unwrap_or_else(PoisonError::into_inner)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
