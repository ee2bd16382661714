//! Benchmark orchestration: corpus scanning, per-slot mixing, progress and
//! the run manifest.
//!
//! # Architecture
//!
//! ```text
//! BenchmarkConfig
//!        │
//!        ▼
//! BenchmarkOrchestrator::prepare()      ← scans each directory once
//!        │                                 (Corpus + loudness reference)
//!        ├─ generate()                   ← sequential
//!        └─ generate_concurrent()        ← spawn_blocking + Semaphore
//!              │
//!              └─ per slot: pick → conform → MixEngine → audio{k}.wav
//!
//! SharedProgress (Arc<Mutex<RunProgress>>) ←── polled by the CLI progress task
//! manifest.json                            ←── written at the end
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use sound_merge::config::BenchmarkConfig;
//! use sound_merge::pipeline::BenchmarkOrchestrator;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BenchmarkConfig::load().unwrap();
//!     let orchestrator = Arc::new(BenchmarkOrchestrator::prepare(config, None).unwrap());
//!     let cancel = Arc::new(AtomicBool::new(false));
//!
//!     let report = orchestrator.generate_concurrent(4, cancel).await.unwrap();
//!     println!("seed {} → {} files", report.seed, report.written());
//! }
//! ```

pub mod manifest;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use manifest::{Manifest, SlotRecord, SourceSummary, MANIFEST_FILE};
pub use runner::{slot_seed, BenchmarkOrchestrator, CorpusPool, RunReport};
pub use state::{new_shared_progress, RunPhase, RunProgress, SharedProgress};
