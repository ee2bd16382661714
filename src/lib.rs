//! Loudness-normalized, randomized speech/music mixture generator.
//!
//! | Module | Role |
//! |--------|------|
//! | [`audio`] | PCM buffers, WAV I/O, channel/rate conversion |
//! | [`loudness`] | dBFS measurement, corpus percentiles, gain |
//! | [`augment`] | duration fitting, silence masking, step chains |
//! | [`mix`] | overlay, target-level choice, N-source fold engine |
//! | [`pipeline`] | benchmark orchestration, progress, manifest |
//! | [`config`] | TOML settings |
//! | [`error`] | [`MergeError`](error::MergeError) |

pub mod audio;
pub mod augment;
pub mod config;
pub mod error;
pub mod loudness;
pub mod mix;
pub mod pipeline;

#[cfg(test)]
mod test_support;
