//! Randomized silence masking.
//!
//! `n = min(total, len) / interval` windows of `interval` frames are placed
//! uniformly at random without overlapping, then silenced in ascending order.
//! Audio before a window fades out and audio after it fades in, each over
//! `min(fade, distance to the neighbouring boundary)` frames, so no window
//! boundary produces a click.  Fades never reach zero, which keeps the
//! silenced frame count exactly `n * interval`.

use std::ops::Range;

use rand::Rng;

use crate::audio::SampleBuffer;
use crate::error::{MergeError, Result};

use super::fit::fade_in_gain;

/// Choose `min(total_frames, len) / interval_frames` non-overlapping windows
/// in a buffer of `len` frames, sorted by start.
///
/// Placement draws each window's share of the free space uniformly and then
/// stacks the windows left to right, which spreads them over the whole
/// buffer without rejection sampling.
pub fn plan_silence_windows<R: Rng + ?Sized>(
    len: usize,
    total_frames: usize,
    interval_frames: usize,
    rng: &mut R,
) -> Result<Vec<Range<usize>>> {
    if interval_frames == 0 {
        return Err(MergeError::InvalidArgument("silence interval must be > 0".into()));
    }

    let count = total_frames.min(len) / interval_frames;
    let slots = len / interval_frames;
    if count > slots {
        return Err(MergeError::InvalidArgument(format!(
            "{count} silence intervals do not fit into {slots} non-overlapping slots"
        )));
    }

    let free = len - count * interval_frames;
    let mut offsets: Vec<usize> = (0..count).map(|_| rng.gen_range(0..=free)).collect();
    offsets.sort_unstable();

    Ok(offsets
        .into_iter()
        .enumerate()
        .map(|(i, offset)| {
            let start = offset + i * interval_frames;
            start..start + interval_frames
        })
        .collect())
}

/// Silence `total_silence_ms` of `buffer` in `interval_ms` chunks with
/// `fade_ms` fades around every chunk.
pub fn random_silence_mask<R: Rng + ?Sized>(
    buffer: &SampleBuffer,
    total_silence_ms: u64,
    interval_ms: u64,
    fade_ms: u64,
    rng: &mut R,
) -> Result<SampleBuffer> {
    let len = buffer.frames();
    let windows = plan_silence_windows(
        len,
        buffer.ms_to_frames(total_silence_ms),
        buffer.ms_to_frames(interval_ms),
        rng,
    )?;
    let fade = buffer.ms_to_frames(fade_ms);
    let ch = usize::from(buffer.channels());

    let mut values = buffer.to_normalized();
    let mut scale = |frames: Range<usize>, gain: &dyn Fn(usize, usize) -> f64| {
        let n = frames.len();
        for (i, frame) in frames.enumerate() {
            let g = gain(i, n);
            for v in &mut values[frame * ch..(frame + 1) * ch] {
                *v *= g;
            }
        }
    };

    for (k, window) in windows.iter().enumerate() {
        let prev_end = if k == 0 { 0 } else { windows[k - 1].end };
        let next_start = windows.get(k + 1).map_or(len, |w| w.start);

        let out_len = fade.min(window.start - prev_end);
        scale(window.start - out_len..window.start, &|i: usize, n: usize| {
            1.0 - fade_in_gain(i, n)
        });

        scale(window.clone(), &|_: usize, _: usize| 0.0);

        let in_len = fade.min(next_start - window.end);
        scale(window.end..window.end + in_len, &fade_in_gain);
    }

    log::debug!(
        "silence: {} window(s) of {interval_ms} ms in {} ms",
        windows.len(),
        buffer.duration_ms()
    );
    SampleBuffer::from_normalized(&values, buffer.spec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSpec;
    use crate::test_support::constant;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spec() -> AudioSpec {
        AudioSpec::new(1, 8_000, 16)
    }

    fn zero_frames(buf: &SampleBuffer) -> usize {
        buf.samples().iter().filter(|&&s| s == 0).count()
    }

    #[test]
    fn windows_never_overlap_and_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let windows = plan_silence_windows(1_000, 700, 90, &mut rng).unwrap();
            assert_eq!(windows.len(), 7);
            assert!(windows.iter().all(|w| w.len() == 90 && w.end <= 1_000));
            assert!(windows.windows(2).all(|p| p[0].end <= p[1].start), "{windows:?}");
        }
    }

    #[test]
    fn total_is_clamped_to_buffer_length() {
        let mut rng = StdRng::seed_from_u64(12);
        let windows = plan_silence_windows(1_000, 5_000, 300, &mut rng).unwrap();
        // min(5000, 1000) / 300 = 3
        assert_eq!(windows.len(), 3);
    }

    #[test]
    fn zero_interval_rejected() {
        let mut rng = StdRng::seed_from_u64(13);
        assert!(matches!(
            plan_silence_windows(1_000, 100, 0, &mut rng).unwrap_err(),
            MergeError::InvalidArgument(_)
        ));
    }

    #[test]
    fn silenced_frames_equal_whole_intervals() {
        // 1 s at 8 kHz, 330 ms requested in 100 ms chunks → 3 × 800 frames
        let buf = constant(0.5, 8_000, spec());
        let mut rng = StdRng::seed_from_u64(14);
        let out = random_silence_mask(&buf, 330, 100, 10, &mut rng).unwrap();
        assert_eq!(out.frames(), buf.frames());
        assert_eq!(zero_frames(&out), 3 * 800);
    }

    #[test]
    fn fades_ramp_into_and_out_of_silence() {
        let buf = constant(0.5, 8_000, spec());
        let mut rng = StdRng::seed_from_u64(15);
        let out = random_silence_mask(&buf, 100, 100, 10, &mut rng).unwrap();
        let s = out.samples();

        let start = s.iter().position(|&v| v == 0).expect("one window");
        let end = start + 800;
        assert!(s[start..end].iter().all(|&v| v == 0));

        // 10 ms at 8 kHz = 80 fade frames on each side (when there is room)
        if start >= 80 {
            let fade_out = &s[start - 80..start];
            assert!(fade_out.windows(2).all(|w| w[1] <= w[0]), "{fade_out:?}");
            assert!(fade_out[79] < 16_384 && fade_out[79] > 0);
        }
        if end + 80 <= s.len() {
            let fade_in = &s[end..end + 80];
            assert!(fade_in.windows(2).all(|w| w[1] >= w[0]), "{fade_in:?}");
            assert!(fade_in[0] < 16_384 && fade_in[0] > 0);
        }
    }

    #[test]
    fn no_silence_requested_leaves_audio_untouched() {
        let buf = constant(0.5, 800, spec());
        let mut rng = StdRng::seed_from_u64(16);
        let out = random_silence_mask(&buf, 50, 100, 10, &mut rng).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn input_buffer_is_not_mutated() {
        let buf = constant(0.5, 8_000, spec());
        let before = buf.clone();
        let mut rng = StdRng::seed_from_u64(17);
        let _ = random_silence_mask(&buf, 500, 100, 10, &mut rng).unwrap();
        assert_eq!(buf, before);
    }
}
