//! Command-line entry point for sound-merge.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`).
//! 2. Parse the command line.
//! 3. Load [`BenchmarkConfig`] from disk (defaults when missing) and apply
//!    command-line overrides.
//! 4. Create the [`tokio`] runtime and install the Ctrl-C handler.
//! 5. Scan the corpora and generate, sequentially or on the blocking pool,
//!    while a background task logs the shared progress.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use sound_merge::config::{AppPaths, BenchmarkConfig, SourceConfig};
use sound_merge::mix::DistributionMode;
use sound_merge::pipeline::{BenchmarkOrchestrator, RunProgress, SharedProgress};

/// How often a running generation logs its progress.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "sound-merge", version, about)]
struct Cli {
    /// Settings file (defaults to $SOUND_MERGE_CONFIG, then the platform
    /// config directory).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate mixture files.
    Generate(RunArgs),
    /// Scan the source directories and print their loudness references.
    References(RunArgs),
    /// Write a default settings file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Overrides for values of the settings file.
#[derive(Debug, Args)]
struct RunArgs {
    /// Source directory with optional percentile, `DIR` or `DIR=0.9`.
    /// Repeat for every source; replaces the configured sources.
    #[arg(short, long = "source", value_parser = parse_source)]
    sources: Vec<SourceConfig>,

    /// `uniform` or `normal`.
    #[arg(long)]
    distribution: Option<DistributionMode>,

    /// Output duration in seconds.
    #[arg(short, long)]
    duration: Option<f64>,

    /// Number of files to generate.
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Output directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Fixed loudness of every finished file, in dBFS.
    #[arg(long, allow_hyphen_values = true)]
    final_dbfs: Option<f64>,

    /// Files generated in parallel.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Convert every clip to this sample rate.
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Convert every clip to this channel count.
    #[arg(long)]
    channels: Option<u16>,

    /// Do not write manifest.json.
    #[arg(long)]
    no_manifest: bool,
}

impl RunArgs {
    fn apply(self, config: &mut BenchmarkConfig) {
        if !self.sources.is_empty() {
            config.sources = self.sources;
        }
        if let Some(mode) = self.distribution {
            config.distribution = mode;
        }
        if let Some(secs) = self.duration {
            config.target_duration_secs = secs;
        }
        if let Some(count) = self.count {
            config.file_count = count;
        }
        if let Some(dir) = self.output {
            config.destination = dir;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.final_dbfs.is_some() {
            config.final_dbfs = self.final_dbfs;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.sample_rate.is_some() {
            config.format.sample_rate = self.sample_rate;
        }
        if self.channels.is_some() {
            config.format.channels = self.channels;
        }
        if self.no_manifest {
            config.write_manifest = false;
        }
    }
}

fn parse_source(arg: &str) -> std::result::Result<SourceConfig, String> {
    match arg.rsplit_once('=') {
        Some((dir, p)) => {
            let percentile: f64 = p
                .parse()
                .map_err(|_| format!("percentile {p:?} is not a number"))?;
            Ok(SourceConfig::new(dir, percentile))
        }
        None => Ok(SourceConfig::new(arg, 0.5)),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn load_config(path: &Path, args: RunArgs) -> Result<BenchmarkConfig> {
    let mut config = BenchmarkConfig::load_from(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    args.apply(&mut config);
    Ok(config)
}

fn snapshot(progress: &SharedProgress) -> RunProgress {
    progress.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Log a status line whenever another slot completes, until the run ends.
async fn report_progress(progress: SharedProgress) {
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let mut last_attempted = None;
    loop {
        ticker.tick().await;
        let current = snapshot(&progress);
        if current.is_over() {
            break;
        }
        if current.phase.is_busy() && last_attempted != Some(current.attempted()) {
            log::info!("{}", current.status_line());
            last_attempted = Some(current.attempted());
        }
    }
}

fn generate(path: &Path, args: RunArgs) -> Result<()> {
    let config = load_config(path, args)?;
    let workers = config.workers;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let orchestrator = Arc::new(BenchmarkOrchestrator::prepare(config, None)?);

    let progress = orchestrator.progress();
    rt.spawn(report_progress(Arc::clone(&progress)));

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        let progress = Arc::clone(&progress);
        rt.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!(
                    "Ctrl-C received at {}; finishing files already in progress",
                    snapshot(&progress).status_line()
                );
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let report = if workers > 1 {
        rt.block_on(Arc::clone(&orchestrator).generate_concurrent(workers, cancel))?
    } else {
        orchestrator.generate_with_cancel(&cancel)?
    };

    println!(
        "seed {}: {} ({} written to {})",
        report.seed,
        snapshot(&progress).status_line(),
        report.written(),
        orchestrator.config().destination.display()
    );
    if report.written() == 0 && !report.cancelled {
        bail!("no file could be generated; see the warnings above");
    }
    Ok(())
}

fn references(path: &Path, args: RunArgs) -> Result<()> {
    let config = load_config(path, args)?;
    let orchestrator = BenchmarkOrchestrator::prepare(config, None)?;
    for pool in orchestrator.pools() {
        let corpus = pool.corpus();
        println!(
            "{}\t{}\t{:.2} dBFS\t{} file(s)",
            corpus.directory().display(),
            corpus.reference().aggregation,
            corpus.reference_db(),
            corpus.files().len()
        );
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    BenchmarkConfig::default()
        .save_to(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = AppPaths::resolve_settings(cli.config);
    log::debug!("settings file {}", settings.display());

    match cli.command {
        Command::Generate(args) => generate(&settings, args),
        Command::References(args) => references(&settings, args),
        Command::InitConfig { force } => init_config(&settings, force),
    }
}
