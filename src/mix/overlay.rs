//! Sample-wise overlay with a global peak limiter.

use crate::audio::SampleBuffer;
use crate::error::Result;

/// Add `addition` onto `canvas` starting at `position_ms`.
///
/// The canvas is never shrunk: the part of `addition` that would run past
/// the canvas end is dropped, and a position beyond the canvas leaves it
/// unchanged.  When the summed peak exceeds full scale the whole result is
/// scaled by `1 / peak` (one gain for every channel), so nothing clips.
///
/// # Errors
///
/// [`MergeError::IncompatibleFormat`](crate::error::MergeError) when the two
/// buffers differ in rate, channel count or bit depth.
///
/// # Example
///
/// ```rust
/// use sound_merge::audio::{AudioSpec, SampleBuffer};
/// use sound_merge::mix::overlay;
///
/// let spec = AudioSpec::new(1, 1_000, 16);
/// let canvas = SampleBuffer::from_normalized(&[0.9, 0.9, 0.0], spec).unwrap();
/// let voice = SampleBuffer::from_normalized(&[0.9, -0.9, 0.9, 0.9], spec).unwrap();
///
/// let mixed = overlay(&canvas, &voice, 0).unwrap();
/// assert_eq!(mixed.frames(), 3);          // addition truncated to the canvas
/// assert!(mixed.peak() <= 1.0);           // 1.8 peak rescaled to full scale
/// ```
pub fn overlay(canvas: &SampleBuffer, addition: &SampleBuffer, position_ms: u64) -> Result<SampleBuffer> {
    canvas.ensure_compatible(addition)?;

    let ch = usize::from(canvas.channels());
    let start = canvas.ms_to_frames(position_ms);
    let mut mixed = canvas.to_normalized();

    if start < canvas.frames() {
        let frames = (canvas.frames() - start).min(addition.frames());
        let add = addition.to_normalized();
        for (dst, src) in mixed[start * ch..(start + frames) * ch].iter_mut().zip(&add) {
            *dst += src;
        }
    }

    let gain = limit_peak(&mut mixed);
    if gain < 1.0 {
        log::debug!("overlay: peak limiter applied {:.2} dB", 20.0 * gain.log10());
    }

    SampleBuffer::from_normalized(&mixed, canvas.spec())
}

/// Scale `values` down so the absolute peak is at most `1.0`; returns the
/// applied gain (`1.0` when nothing was changed).
pub(crate) fn limit_peak(values: &mut [f64]) -> f64 {
    let peak = values.iter().map(|v| v.abs()).fold(0.0, f64::max);
    if peak <= 1.0 {
        return 1.0;
    }
    let gain = 1.0 / peak;
    for v in values.iter_mut() {
        *v *= gain;
    }
    gain
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
