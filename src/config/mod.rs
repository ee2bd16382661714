//! Configuration for benchmark runs.
//!
//! Provides `BenchmarkConfig` (top-level settings), per-source sub-configs,
//! `AppPaths` for the cross-platform settings location, and TOML persistence
//! via `BenchmarkConfig::load_from` / `BenchmarkConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::{AppPaths, CONFIG_ENV};
pub use settings::{BenchmarkConfig, FormatConfig, SilenceConfig, SourceConfig};
