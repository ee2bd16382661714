//! Explicit sample-rate and channel-count conversion.
//!
//! Mixing never converts formats implicitly: buffers that differ in rate or
//! channel count are rejected with
//! [`MergeError::IncompatibleFormat`](crate::error::MergeError).  When the
//! run configuration asks for a common output format, sources are passed
//! through [`conform`] right after loading:
//!
//! 1. [`remix_channels`]: mono ↔ multi-channel conversion.
//! 2. [`resample`]: band-limited sinc resampling via `rubato`
//!    (`SincFixedIn` + `BlackmanHarris2` window).

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{MergeError, Result};

use super::buffer::{AudioSpec, SampleBuffer};

// ---------------------------------------------------------------------------
// remix_channels
// ---------------------------------------------------------------------------

/// Convert `buffer` to `channels` interleaved channels.
///
/// * Same channel count → copy.
/// * Mono → N channels duplicates the signal on every channel.
/// * N channels → mono averages each frame.
///
/// Any other combination (e.g. 6 → 2) has no unambiguous downmix and is
/// rejected.
///
/// # Example
///
/// ```rust
/// use sound_merge::audio::{remix_channels, SampleBuffer};
///
/// let stereo = SampleBuffer::new(vec![100, -100, 200, 200], 2, 8_000, 16).unwrap();
/// let mono = remix_channels(&stereo, 1).unwrap();
/// assert_eq!(mono.samples(), &[0, 200]);
/// ```
pub fn remix_channels(buffer: &SampleBuffer, channels: u16) -> Result<SampleBuffer> {
    let spec = buffer.spec();
    let target = AudioSpec { channels, ..spec };

    match (spec.channels, channels) {
        (_, 0) => Err(MergeError::InvalidArgument("channel count must be > 0".into())),
        (from, to) if from == to => Ok(buffer.clone()),
        (1, to) => {
            let to = usize::from(to);
            let samples = buffer
                .samples()
                .iter()
                .flat_map(|&s| std::iter::repeat(s).take(to))
                .collect();
            SampleBuffer::with_spec(samples, target)
        }
        (from, 1) => {
            let from = usize::from(from);
            let mono: Vec<f64> = buffer
                .to_normalized()
                .chunks_exact(from)
                .map(|frame| frame.iter().sum::<f64>() / from as f64)
                .collect();
            SampleBuffer::from_normalized(&mono, target)
        }
        _ => Err(MergeError::IncompatibleFormat {
            left: spec.to_string(),
            right: target.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample `buffer` to `target_rate` Hz.
///
/// * Same rate → copy, no interpolation performed.
/// * Empty input → empty output at the new rate.
///
/// The output holds `round(frames * target_rate / source_rate)` frames; the
/// resampler's group delay is trimmed so the signal stays time-aligned.
pub fn resample(buffer: &SampleBuffer, target_rate: u32) -> Result<SampleBuffer> {
    if target_rate == 0 {
        return Err(MergeError::InvalidArgument("target sample rate must be > 0".into()));
    }

    let spec = buffer.spec();
    let target = AudioSpec {
        sample_rate: target_rate,
        ..spec
    };

    if spec.sample_rate == target_rate {
        return Ok(buffer.clone());
    }

    let frames = buffer.frames();
    if frames == 0 {
        return SampleBuffer::silent(target, 0);
    }

    let ratio = f64::from(target_rate) / f64::from(spec.sample_rate);
    let expected = (frames as f64 * ratio).round() as usize;
    let ch = usize::from(spec.channels);

    let planar = deinterleave(&buffer.to_normalized(), ch);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.0, params, frames, ch)
        .map_err(|e| MergeError::InvalidArgument(format!("resampler setup failed: {e}")))?;

    let delay = resampler.output_delay();
    let mut planar_out = resampler
        .process(&planar, None)
        .map_err(|e| MergeError::InvalidArgument(format!("resampling failed: {e}")))?;

    // Flush the filter tail until the delayed signal is fully out.
    while planar_out[0].len() < delay + expected {
        let tail = resampler
            .process_partial(None::<&[Vec<f64>]>, None)
            .map_err(|e| MergeError::InvalidArgument(format!("resampling failed: {e}")))?;
        if tail[0].is_empty() {
            break;
        }
        for (out, more) in planar_out.iter_mut().zip(tail) {
            out.extend(more);
        }
    }

    let mut interleaved = Vec::with_capacity(expected * ch);
    for i in 0..expected {
        for channel in &planar_out {
            interleaved.push(channel.get(delay + i).copied().unwrap_or(0.0));
        }
    }

    SampleBuffer::from_normalized(&interleaved, target)
}

// ---------------------------------------------------------------------------
// conform
// ---------------------------------------------------------------------------

/// Apply the optional channel and rate conversions, channels first.
pub fn conform(
    buffer: &SampleBuffer,
    channels: Option<u16>,
    sample_rate: Option<u32>,
) -> Result<SampleBuffer> {
    let remixed = match channels {
        Some(ch) => remix_channels(buffer, ch)?,
        None => buffer.clone(),
    };
    match sample_rate {
        Some(rate) => resample(&remixed, rate),
        None => Ok(remixed),
    }
}

fn deinterleave(values: &[f64], channels: usize) -> Vec<Vec<f64>> {
    let mut planar = vec![Vec::with_capacity(values.len() / channels); channels];
    for frame in values.chunks_exact(channels) {
        for (c, &v) in frame.iter().enumerate() {
            planar[c].push(v);
        }
    }
    planar
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tone;

    // ---- remix_channels ----------------------------------------------------

    #[test]
    fn remix_same_channel_count_is_copy() {
        let buf = SampleBuffer::new(vec![1, 2, 3, 4], 2, 8_000, 16).unwrap();
        assert_eq!(remix_channels(&buf, 2).unwrap(), buf);
    }

    #[test]
    fn remix_mono_to_stereo_duplicates() {
        let buf = SampleBuffer::new(vec![5, -7], 1, 8_000, 16).unwrap();
        let out = remix_channels(&buf, 2).unwrap();
        assert_eq!(out.samples(), &[5, 5, -7, -7]);
        assert_eq!(out.channels(), 2);
        assert_eq!(out.frames(), 2);
    }

    #[test]
    fn remix_stereo_to_mono_averages() {
        let buf = SampleBuffer::new(vec![1_000, -1_000, 400, 600], 2, 8_000, 16).unwrap();
        let out = remix_channels(&buf, 1).unwrap();
        assert_eq!(out.samples(), &[0, 500]);
    }

    #[test]
    fn remix_ambiguous_downmix_rejected() {
        let buf = SampleBuffer::new(vec![0; 6], 6, 8_000, 16).unwrap();
        assert!(matches!(
            remix_channels(&buf, 2).unwrap_err(),
            MergeError::IncompatibleFormat { .. }
        ));
        assert!(remix_channels(&buf, 0).is_err());
    }

    // ---- resample ----------------------------------------------------------

    #[test]
    fn resample_same_rate_is_noop() {
        let buf = tone(440.0, 0.1, 0.5, AudioSpec::new(1, 16_000, 16));
        assert_eq!(resample(&buf, 16_000).unwrap(), buf);
    }

    #[test]
    fn resample_empty_input() {
        let buf = SampleBuffer::silent(AudioSpec::new(1, 44_100, 16), 0).unwrap();
        let out = resample(&buf, 16_000).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.sample_rate(), 16_000);
    }

    #[test]
    fn resample_44100_to_16k_output_length() {
        let buf = tone(440.0, 1.0, 0.5, AudioSpec::new(1, 44_100, 16));
        let out = resample(&buf, 16_000).unwrap();
        assert_eq!(out.frames(), 16_000);
        assert_eq!(out.sample_rate(), 16_000);
    }

    #[test]
    fn resample_keeps_channels_and_loudness() {
        let buf = tone(440.0, 1.0, 0.5, AudioSpec::new(2, 16_000, 16));
        let out = resample(&buf, 48_000).unwrap();
        assert_eq!(out.channels(), 2);
        assert_eq!(out.frames(), 48_000);
        assert!(
            (out.dbfs() - buf.dbfs()).abs() < 0.5,
            "loudness drift: {} vs {}",
            out.dbfs(),
            buf.dbfs()
        );
    }

    #[test]
    fn resample_zero_rate_rejected() {
        let buf = tone(440.0, 0.1, 0.5, AudioSpec::new(1, 16_000, 16));
        assert!(matches!(resample(&buf, 0).unwrap_err(), MergeError::InvalidArgument(_)));
    }

    // ---- conform -----------------------------------------------------------

    #[test]
    fn conform_applies_both_conversions() {
        let buf = tone(440.0, 0.5, 0.5, AudioSpec::new(2, 22_050, 16));
        let out = conform(&buf, Some(1), Some(44_100)).unwrap();
        assert_eq!(out.spec(), AudioSpec::new(1, 44_100, 16));
        assert_eq!(out.frames(), 22_050);
    }

    #[test]
    fn conform_without_targets_is_copy() {
        let buf = tone(440.0, 0.1, 0.5, AudioSpec::new(1, 8_000, 16));
        assert_eq!(conform(&buf, None, None).unwrap(), buf);
    }
}
