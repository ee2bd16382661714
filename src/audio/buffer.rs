//! Immutable interleaved PCM buffer with format metadata.
//!
//! [`SampleBuffer`] stores signed 16-bit samples (interleaved per channel)
//! together with an [`AudioSpec`].  All arithmetic in the crate runs on the
//! floating-point view returned by [`SampleBuffer::to_normalized`] and is
//! converted back with [`SampleBuffer::from_normalized`], which clips to
//! `[-1, 1]` before quantization so no value ever wraps around.
//!
//! # Example
//!
//! ```rust
//! use sound_merge::audio::{AudioSpec, SampleBuffer};
//!
//! let spec = AudioSpec::new(1, 8_000, 16);
//! let buf = SampleBuffer::from_normalized(&[0.5, -0.5, 2.0], spec).unwrap();
//! // 2.0 is clipped to full scale instead of wrapping
//! assert_eq!(buf.samples(), &[16_384, -16_384, 32_767]);
//! assert_eq!(buf.frames(), 3);
//! ```

use std::fmt;

use crate::error::{MergeError, Result};

// ---------------------------------------------------------------------------
// AudioSpec
// ---------------------------------------------------------------------------

/// Format triple shared by every buffer that takes part in a mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioSpec {
    /// Number of interleaved channels (≥ 1).
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Bits per sample, `1..=16`.
    pub bit_depth: u16,
}

impl AudioSpec {
    pub fn new(channels: u16, sample_rate: u32, bit_depth: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bit_depth,
        }
    }

    /// Largest magnitude representable at this bit depth
    /// (`2^(bit_depth - 1)`), i.e. the value that maps to `1.0`.
    pub fn max_amplitude(&self) -> f64 {
        f64::from(1_u32 << (self.bit_depth.saturating_sub(1)))
    }

    /// Convert a duration in milliseconds to a whole number of frames
    /// (rounded down).
    pub fn ms_to_frames(&self, ms: u64) -> usize {
        (u128::from(ms) * u128::from(self.sample_rate) / 1_000) as usize
    }

    /// Convert a frame count back to whole milliseconds (rounded down).
    pub fn frames_to_ms(&self, frames: usize) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (frames as u128 * 1_000 / u128::from(self.sample_rate)) as u64
    }

    fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(MergeError::InvalidArgument("channel count must be > 0".into()));
        }
        if self.sample_rate == 0 {
            return Err(MergeError::InvalidArgument("sample rate must be > 0".into()));
        }
        if !(1..=16).contains(&self.bit_depth) {
            return Err(MergeError::InvalidArgument(format!(
                "bit depth must be within 1..=16, got {}",
                self.bit_depth
            )));
        }
        Ok(())
    }
}

impl fmt::Display for AudioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ch, {} bit, {} Hz",
            self.channels, self.bit_depth, self.sample_rate
        )
    }
}

// ---------------------------------------------------------------------------
// SampleBuffer
// ---------------------------------------------------------------------------

/// In-memory PCM clip.
///
/// ## Invariants
///
/// * `samples.len() % channels == 0`
/// * the spec passed [`AudioSpec`] validation
///
/// Every transforming operation returns a new buffer; the receiver is never
/// mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<i16>,
    spec: AudioSpec,
}

impl SampleBuffer {
    /// Build a buffer from already-quantized interleaved samples.
    pub fn new(samples: Vec<i16>, channels: u16, sample_rate: u32, bit_depth: u16) -> Result<Self> {
        Self::with_spec(samples, AudioSpec::new(channels, sample_rate, bit_depth))
    }

    pub fn with_spec(samples: Vec<i16>, spec: AudioSpec) -> Result<Self> {
        spec.validate()?;
        if samples.len() % usize::from(spec.channels) != 0 {
            return Err(MergeError::InvalidArgument(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                spec.channels
            )));
        }
        Ok(Self { samples, spec })
    }

    /// Build a buffer from raw little-endian 16-bit PCM bytes.
    pub fn from_pcm_bytes(bytes: &[u8], channels: u16, sample_rate: u32, bit_depth: u16) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(MergeError::InvalidArgument(format!(
                "PCM byte length {} is not a multiple of 2",
                bytes.len()
            )));
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(samples, channels, sample_rate, bit_depth)
    }

    /// Quantize a normalized float view back into the integer domain.
    ///
    /// Values are clipped to `[-1, 1]` first, so out-of-range input saturates
    /// at full scale rather than wrapping.
    pub fn from_normalized(values: &[f64], spec: AudioSpec) -> Result<Self> {
        spec.validate()?;
        let max = spec.max_amplitude();
        let samples = values.iter().map(|&v| quantize(v, max)).collect();
        Self::with_spec(samples, spec)
    }

    /// A buffer of `frames` frames of digital silence.
    pub fn silent(spec: AudioSpec, frames: usize) -> Result<Self> {
        Self::with_spec(vec![0; frames * usize::from(spec.channels)], spec)
    }

    /// Float view of the samples, scaled into `[-1, 1]`.
    pub fn to_normalized(&self) -> Vec<f64> {
        let max = self.spec.max_amplitude();
        self.samples.iter().map(|&s| f64::from(s) / max).collect()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    pub fn channels(&self) -> u16 {
        self.spec.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn bit_depth(&self) -> u16 {
        self.spec.bit_depth
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.spec.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.spec.sample_rate)
    }

    /// Duration in whole milliseconds (rounded down).
    pub fn duration_ms(&self) -> u64 {
        self.spec.frames_to_ms(self.frames())
    }

    pub fn ms_to_frames(&self, ms: u64) -> usize {
        self.spec.ms_to_frames(ms)
    }

    /// Root-mean-square of the normalized samples.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let max = self.spec.max_amplitude();
        let sum_sq: f64 = self
            .samples
            .iter()
            .map(|&s| {
                let v = f64::from(s) / max;
                v * v
            })
            .sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }

    /// Loudness in dBFS; a zero-RMS buffer is `-inf`.
    pub fn dbfs(&self) -> f64 {
        let rms = self.rms();
        if rms == 0.0 {
            return f64::NEG_INFINITY;
        }
        20.0 * rms.log10()
    }

    /// Largest absolute normalized sample value.
    pub fn peak(&self) -> f64 {
        let max = self.spec.max_amplitude();
        self.samples
            .iter()
            .map(|&s| (f64::from(s) / max).abs())
            .fold(0.0, f64::max)
    }

    /// Copy frames `start..end`.
    pub fn slice_by_frame(&self, start: usize, end: usize) -> Result<Self> {
        let len = self.frames();
        if start > end || end > len {
            return Err(MergeError::Range { start, end, len });
        }
        let ch = usize::from(self.spec.channels);
        Ok(Self {
            samples: self.samples[start * ch..end * ch].to_vec(),
            spec: self.spec,
        })
    }

    /// Copy the frames between `start_s` and `end_s` seconds.
    pub fn slice_by_time(&self, start_s: f64, end_s: f64) -> Result<Self> {
        if !(start_s >= 0.0 && end_s >= 0.0 && start_s.is_finite() && end_s.is_finite()) {
            return Err(MergeError::InvalidArgument(format!(
                "slice times must be finite and non-negative, got {start_s}..{end_s}"
            )));
        }
        let rate = f64::from(self.spec.sample_rate);
        let start = (start_s * rate).floor() as usize;
        let end = (end_s * rate).floor() as usize;
        self.slice_by_frame(start, end)
    }

    /// Comparability predicate: same rate, channel count and bit depth.
    pub fn is_compatible(&self, other: &SampleBuffer) -> bool {
        self.spec == other.spec
    }

    pub fn ensure_compatible(&self, other: &SampleBuffer) -> Result<()> {
        if self.is_compatible(other) {
            Ok(())
        } else {
            Err(MergeError::IncompatibleFormat {
                left: self.spec.to_string(),
                right: other.spec.to_string(),
            })
        }
    }

    /// Plain (no crossfade) concatenation of two compatible buffers.
    pub fn concat(&self, other: &SampleBuffer) -> Result<Self> {
        self.ensure_compatible(other)?;
        let mut samples = Vec::with_capacity(self.samples.len() + other.samples.len());
        samples.extend_from_slice(&self.samples);
        samples.extend_from_slice(&other.samples);
        Ok(Self {
            samples,
            spec: self.spec,
        })
    }
}

impl fmt::Display for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {:.3} s", self.spec, self.duration_secs())
    }
}

fn quantize(value: f64, max: f64) -> i16 {
    let scaled = (value.clamp(-1.0, 1.0) * max).round();
    scaled.clamp(-max, max - 1.0) as i16
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
