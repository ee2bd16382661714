//! Audio substrate: PCM buffers, the WAV boundary and format conversion.
//!
//! # Pipeline position
//!
//! ```text
//! corpus dir → list_candidate_files → load_audio → conform (optional)
//!            → SampleBuffer → loudness / augment / mix → save_audio
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sound_merge::audio::{list_candidate_files, load_audio};
//!
//! for path in list_candidate_files(Path::new("data/speech")).unwrap() {
//!     let clip = load_audio(&path).unwrap();
//!     println!("{}: {} ({:.1} dBFS)", path.display(), clip, clip.dbfs());
//! }
//! ```

pub mod buffer;
pub mod resample;
pub mod wav;

pub use buffer::{AudioSpec, SampleBuffer};
pub use resample::{conform, remix_channels, resample};
pub use wav::{list_candidate_files, load_audio, save_audio};
