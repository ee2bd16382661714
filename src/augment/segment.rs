//! Random contiguous sub-segment extraction.

use rand::Rng;

use crate::audio::SampleBuffer;
use crate::error::{MergeError, Result};

/// Uniformly random window of exactly `length_ms` milliseconds.
///
/// # Errors
///
/// [`MergeError::InvalidArgument`] when `length_ms` is longer than the
/// buffer.
pub fn random_segment<R: Rng + ?Sized>(
    buffer: &SampleBuffer,
    length_ms: u64,
    rng: &mut R,
) -> Result<SampleBuffer> {
    let length = buffer.ms_to_frames(length_ms);
    if length > buffer.frames() {
        return Err(MergeError::InvalidArgument(format!(
            "segment of {length_ms} ms is longer than the {} ms buffer",
            buffer.duration_ms()
        )));
    }
    random_window(buffer, length, rng)
}

/// Uniformly random window of exactly `length` frames.
pub(crate) fn random_window<R: Rng + ?Sized>(
    buffer: &SampleBuffer,
    length: usize,
    rng: &mut R,
) -> Result<SampleBuffer> {
    let available = buffer.frames();
    if length > available {
        return Err(MergeError::InsufficientLength {
            needed_frames: length,
            available_frames: available,
        });
    }
    let start = rng.gen_range(0..=available - length);
    buffer.slice_by_frame(start, start + length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Mono ramp where each sample equals its frame index.
    fn ramp(frames: usize) -> SampleBuffer {
        let samples = (0..frames).map(|i| i as i16).collect();
        SampleBuffer::new(samples, 1, 1_000, 16).unwrap()
    }

    #[test]
    fn segment_has_exact_length_and_is_contiguous() {
        let buf = ramp(1_000);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let seg = random_segment(&buf, 250, &mut rng).unwrap();
            assert_eq!(seg.frames(), 250);
            let s = seg.samples();
            assert!(s.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }

    #[test]
    fn full_length_segment_is_whole_buffer() {
        let buf = ramp(500);
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(random_segment(&buf, 500, &mut rng).unwrap(), buf);
    }

    #[test]
    fn too_long_segment_rejected() {
        let buf = SampleBuffer::silent(AudioSpec::new(1, 1_000, 16), 100).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            random_segment(&buf, 101, &mut rng).unwrap_err(),
            MergeError::InvalidArgument(_)
        ));
    }

    #[test]
    fn same_seed_same_segment() {
        let buf = ramp(1_000);
        let a = random_segment(&buf, 100, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = random_segment(&buf, 100, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }
}
