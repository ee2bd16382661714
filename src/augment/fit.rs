//! Duration fitting: trim long clips, crossfade-extend short ones.
//!
//! A clip longer than the target is cut to one random window of exactly the
//! target length.  A shorter clip is extended by drawing further clips from
//! the same [`ClipSource`] and joining them with [`append_with_crossfade`]
//! until the target is reached; the head of exactly the target length is
//! kept.  The number of draws is capped, because a pool whose clips are all
//! shorter than the crossfade window never makes progress.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::audio::SampleBuffer;
use crate::error::{MergeError, Result};
use crate::loudness::normalize;

use super::segment::random_window;

// ---------------------------------------------------------------------------
// ClipSource
// ---------------------------------------------------------------------------

/// A pool that duration fitting can draw extension clips from.
///
/// Implementations load lazily (e.g. from a directory corpus) or serve
/// in-memory clips; every drawn clip must already be in the caller's output
/// format.
pub trait ClipSource {
    /// Draw one clip uniformly at random.
    fn draw(&self, rng: &mut StdRng) -> Result<SampleBuffer>;
}

const _: fn() = || {
    fn _assert_object_safe(_: &dyn ClipSource) {}
};

/// In-memory [`ClipSource`].
#[derive(Debug, Clone, Default)]
pub struct BufferPool {
    clips: Vec<SampleBuffer>,
}

impl BufferPool {
    pub fn new(clips: Vec<SampleBuffer>) -> Self {
        Self { clips }
    }
}

impl ClipSource for BufferPool {
    fn draw(&self, rng: &mut StdRng) -> Result<SampleBuffer> {
        self.clips
            .choose(rng)
            .cloned()
            .ok_or_else(|| MergeError::EmptyCorpus("clip pool is empty".into()))
    }
}

/// Wraps a [`ClipSource`] so every drawn clip is normalized to one level,
/// typically the corpus reference the extended clip was normalized to.
pub struct LeveledSource<'a> {
    inner: &'a dyn ClipSource,
    target_dbfs: f64,
}

impl<'a> LeveledSource<'a> {
    pub fn new(inner: &'a dyn ClipSource, target_dbfs: f64) -> Self {
        Self { inner, target_dbfs }
    }
}

impl ClipSource for LeveledSource<'_> {
    fn draw(&self, rng: &mut StdRng) -> Result<SampleBuffer> {
        normalize(&self.inner.draw(rng)?, self.target_dbfs)
    }
}

// ---------------------------------------------------------------------------
// Crossfade
// ---------------------------------------------------------------------------

/// Gain of the rising ramp at step `i` of `n`; strictly inside `(0, 1)`.
///
/// The matching falling ramp is `1 - fade_in_gain(i, n)`, so a crossfade of
/// two identical signals keeps their level.
pub(crate) fn fade_in_gain(i: usize, n: usize) -> f64 {
    (i + 1) as f64 / (n + 1) as f64
}

/// Join `tail` after `head`, overlapping the last `crossfade_ms` of `head`
/// (fading out) with the first `crossfade_ms` of `tail` (fading in).
///
/// The overlap is shortened to the shorter of the two clips, so the result
/// has `head + tail - overlap` frames.
pub fn append_with_crossfade(
    head: &SampleBuffer,
    tail: &SampleBuffer,
    crossfade_ms: u64,
) -> Result<SampleBuffer> {
    head.ensure_compatible(tail)?;

    let ch = usize::from(head.channels());
    let overlap = head
        .ms_to_frames(crossfade_ms)
        .min(head.frames())
        .min(tail.frames());

    let a = head.to_normalized();
    let b = tail.to_normalized();
    let split = (head.frames() - overlap) * ch;

    let mut out = Vec::with_capacity(a.len() + b.len() - overlap * ch);
    out.extend_from_slice(&a[..split]);
    for i in 0..overlap {
        let rise = fade_in_gain(i, overlap);
        for c in 0..ch {
            out.push(a[split + i * ch + c] * (1.0 - rise) + b[i * ch + c] * rise);
        }
    }
    out.extend_from_slice(&b[overlap * ch..]);

    SampleBuffer::from_normalized(&out, head.spec())
}

// ---------------------------------------------------------------------------
// fit_to_duration
// ---------------------------------------------------------------------------

/// Fit `buffer` to exactly `target_ms` milliseconds.
///
/// # Errors
///
/// * [`MergeError::FittingTimeout`]: `max_attempts` extension clips were
///   drawn without reaching the target.
/// * [`MergeError::IncompatibleFormat`]: a drawn clip has another format.
/// * Whatever the [`ClipSource`] reports when a draw fails.
pub fn fit_to_duration(
    buffer: &SampleBuffer,
    target_ms: u64,
    crossfade_ms: u64,
    pool: &dyn ClipSource,
    max_attempts: usize,
    rng: &mut StdRng,
) -> Result<SampleBuffer> {
    let target = buffer.ms_to_frames(target_ms);

    if buffer.frames() == target {
        return Ok(buffer.clone());
    }
    if buffer.frames() > target {
        return random_window(buffer, target, rng);
    }

    let mut fitted = buffer.clone();
    let mut attempts = 0;
    while fitted.frames() < target {
        if attempts >= max_attempts {
            return Err(MergeError::FittingTimeout {
                attempts,
                reached_frames: fitted.frames(),
                target_frames: target,
            });
        }
        let clip = pool.draw(rng)?;
        attempts += 1;
        fitted = append_with_crossfade(&fitted, &clip, crossfade_ms)?;
    }

    log::debug!(
        "fit: extended {} → {} frames with {attempts} clip(s)",
        buffer.frames(),
        fitted.frames()
    );
    fitted.slice_by_frame(0, target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioSpec;
    use crate::test_support::constant;
    use rand::SeedableRng;

    fn spec() -> AudioSpec {
        AudioSpec::new(1, 1_000, 16)
    }

    // ---- append_with_crossfade ---------------------------------------------

    #[test]
    fn crossfade_length_is_sum_minus_overlap() {
        let a = constant(0.5, 300, spec());
        let b = constant(0.5, 200, spec());
        let joined = append_with_crossfade(&a, &b, 50).unwrap();
        assert_eq!(joined.frames(), 450);
    }

    #[test]
    fn crossfade_of_equal_levels_keeps_level() {
        let a = constant(0.5, 100, spec());
        let b = constant(0.5, 100, spec());
        let joined = append_with_crossfade(&a, &b, 40).unwrap();
        for &s in joined.samples() {
            assert!((i32::from(s) - 16_384).abs() <= 1, "sample {s}");
        }
    }

    #[test]
    fn crossfade_ramps_between_levels() {
        let a = constant(0.5, 100, spec());
        let b = SampleBuffer::silent(spec(), 100).unwrap();
        let joined = append_with_crossfade(&a, &b, 10).unwrap();
        let overlap = &joined.samples()[90..100];
        assert!(overlap.windows(2).all(|w| w[1] < w[0]), "{overlap:?}");
        assert!(overlap.iter().all(|&s| s > 0 && s < 16_384));
    }

    #[test]
    fn crossfade_is_clamped_to_shorter_clip() {
        let a = constant(0.5, 100, spec());
        let b = constant(0.5, 5, spec());
        let joined = append_with_crossfade(&a, &b, 50).unwrap();
        assert_eq!(joined.frames(), 100);
    }

    #[test]
    fn crossfade_rejects_mismatched_formats() {
        let a = constant(0.5, 10, spec());
        let b = constant(0.5, 10, AudioSpec::new(2, 1_000, 16));
        assert!(matches!(
            append_with_crossfade(&a, &b, 5).unwrap_err(),
            MergeError::IncompatibleFormat { .. }
        ));
    }

    // ---- fit_to_duration ---------------------------------------------------

    #[test]
    fn long_clip_is_trimmed_to_target() {
        let buf = constant(0.3, 2_000, spec());
        let pool = BufferPool::default();
        let mut rng = StdRng::seed_from_u64(1);
        let out = fit_to_duration(&buf, 750, 20, &pool, 4, &mut rng).unwrap();
        assert_eq!(out.frames(), 750);
    }

    #[test]
    fn exact_clip_is_returned_unchanged() {
        let buf = constant(0.3, 500, spec());
        let mut rng = StdRng::seed_from_u64(1);
        let out = fit_to_duration(&buf, 500, 20, &BufferPool::default(), 4, &mut rng).unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn short_clip_is_extended_from_pool() {
        let buf = constant(0.3, 300, spec());
        let pool = BufferPool::new(vec![constant(0.3, 400, spec())]);
        let mut rng = StdRng::seed_from_u64(1);
        let out = fit_to_duration(&buf, 1_000, 50, &pool, 10, &mut rng).unwrap();
        assert_eq!(out.frames(), 1_000);
        // Same level everywhere, including across the joins
        assert!((out.dbfs() - buf.dbfs()).abs() < 0.01);
    }

    #[test]
    fn leveled_pool_extends_at_the_clip_level() {
        let buf = constant(0.3, 300, spec());
        let quiet = BufferPool::new(vec![constant(0.01, 400, spec())]);
        let leveled = LeveledSource::new(&quiet, buf.dbfs());
        let mut rng = StdRng::seed_from_u64(3);

        let out = fit_to_duration(&buf, 1_000, 50, &leveled, 10, &mut rng).unwrap();
        let head = out.slice_by_frame(0, 250).unwrap();
        let tail = out.slice_by_frame(700, 1_000).unwrap();
        assert!((head.dbfs() - buf.dbfs()).abs() < 0.05, "head {:.2}", head.dbfs());
        assert!((tail.dbfs() - buf.dbfs()).abs() < 0.05, "tail {:.2}", tail.dbfs());
    }

    #[test]
    fn leveled_pool_rejects_silent_clips() {
        let silent = BufferPool::new(vec![SampleBuffer::silent(spec(), 100).unwrap()]);
        let leveled = LeveledSource::new(&silent, -20.0);
        let err = leveled.draw(&mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, MergeError::SilentBuffer), "{err}");
    }

    #[test]
    fn pool_of_tiny_clips_times_out() {
        let buf = constant(0.3, 100, spec());
        // 10 ms clips never outgrow a 50 ms crossfade
        let pool = BufferPool::new(vec![constant(0.3, 10, spec())]);
        let mut rng = StdRng::seed_from_u64(1);
        let err = fit_to_duration(&buf, 1_000, 50, &pool, 8, &mut rng).unwrap_err();
        assert!(
            matches!(err, MergeError::FittingTimeout { attempts: 8, target_frames: 1_000, .. }),
            "{err}"
        );
    }

    #[test]
    fn empty_pool_surfaces_empty_corpus() {
        let buf = constant(0.3, 100, spec());
        let mut rng = StdRng::seed_from_u64(1);
        let err = fit_to_duration(&buf, 1_000, 50, &BufferPool::default(), 8, &mut rng).unwrap_err();
        assert!(matches!(err, MergeError::EmptyCorpus(_)), "{err}");
    }
}
