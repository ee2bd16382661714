//! Gain shifts in the dB domain.
//!
//! All gains are applied to the normalized float view and re-quantized with
//! clipping, so a boost that overshoots full scale saturates instead of
//! wrapping.

use rand::Rng;

use crate::audio::SampleBuffer;
use crate::error::{MergeError, Result};

/// Linear amplitude factor for a gain of `db` decibels.
pub fn db_to_gain(db: f64) -> f64 {
    10_f64.powf(db / 20.0)
}

/// Return a copy of `buffer` scaled by `db` decibels.
pub fn apply_gain_db(buffer: &SampleBuffer, db: f64) -> Result<SampleBuffer> {
    if !db.is_finite() {
        return Err(MergeError::InvalidArgument(format!("gain must be finite, got {db} dB")));
    }
    if db == 0.0 {
        return Ok(buffer.clone());
    }

    let gain = db_to_gain(db);
    let scaled: Vec<f64> = buffer.to_normalized().iter().map(|v| v * gain).collect();
    SampleBuffer::from_normalized(&scaled, buffer.spec())
}

/// Shift `buffer` so that its measured loudness becomes `target_dbfs`.
///
/// # Errors
///
/// * [`MergeError::SilentBuffer`]: the buffer has zero RMS, so no finite
///   gain can reach the target.
/// * [`MergeError::InvalidArgument`]: `target_dbfs` is not finite.
pub fn normalize(buffer: &SampleBuffer, target_dbfs: f64) -> Result<SampleBuffer> {
    if !target_dbfs.is_finite() {
        return Err(MergeError::InvalidArgument(format!(
            "target loudness must be finite, got {target_dbfs} dBFS"
        )));
    }

    let current = buffer.dbfs();
    if !current.is_finite() {
        return Err(MergeError::SilentBuffer);
    }

    apply_gain_db(buffer, target_dbfs - current)
}

/// Map a linear mix weight in `(0, 1]` to the gain change, in dB, that the
/// weight stands for: `10 * log10(percent)`.
///
/// The result is `0` for a weight of `1` and becomes more negative as the
/// weight shrinks, e.g. `0.5 → -3.0103 dB`.
///
/// ```rust
/// use sound_merge::loudness::coefficient_to_db_loss;
///
/// assert_eq!(coefficient_to_db_loss(1.0).unwrap(), 0.0);
/// assert!((coefficient_to_db_loss(0.5).unwrap() + 3.0103).abs() < 1e-4);
/// assert!(coefficient_to_db_loss(0.0).is_err());
/// ```
pub fn coefficient_to_db_loss(percent: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&percent) {
        return Err(MergeError::InvalidArgument(format!(
            "mix weight must be within [0, 1], got {percent}"
        )));
    }
    if percent == 0.0 {
        return Err(MergeError::InvalidArgument(
            "a mix weight of 0 is an infinite dB loss, which is not representable".into(),
        ));
    }
    if percent == 1.0 {
        return Ok(0.0);
    }
    Ok(10.0 * percent.log10())
}

/// Draw a mix weight uniformly from `(0, 1]`.
pub fn random_coefficient<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    1.0 - rng.gen::<f64>()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
