//! Choosing the loudness a fold is normalized to.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};

// ---------------------------------------------------------------------------
// DistributionMode
// ---------------------------------------------------------------------------

/// How the target level is picked from the candidate loudnesses.
///
/// | Variant | Result |
/// |---------|--------|
/// | Uniform | one candidate, picked uniformly at random |
/// | Normal  | arithmetic mean of the candidates (no randomness) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    Uniform,
    Normal,
}

impl Default for DistributionMode {
    fn default() -> Self {
        Self::Uniform
    }
}

impl DistributionMode {
    pub fn label(&self) -> &'static str {
        match self {
            DistributionMode::Uniform => "uniform",
            DistributionMode::Normal => "normal",
        }
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DistributionMode {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(Self::Uniform),
            "normal" => Ok(Self::Normal),
            other => Err(MergeError::InvalidArgument(format!(
                "unknown distribution mode {other:?} (expected \"uniform\" or \"normal\")"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// choose_final_volume
// ---------------------------------------------------------------------------

/// Pick a target dBFS from `candidates`.
///
/// Silent candidates (`-inf`) and other non-finite values are ignored, so a
/// silent canvas never drags the target down to silence.
///
/// # Errors
///
/// [`MergeError::InvalidArgument`] when no finite candidate remains.
pub fn choose_final_volume<R: Rng + ?Sized>(
    candidates: &[f64],
    mode: DistributionMode,
    rng: &mut R,
) -> Result<f64> {
    let finite: Vec<f64> = candidates.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(MergeError::InvalidArgument(
            "no finite loudness to choose a target volume from".into(),
        ));
    }

    let chosen = match mode {
        DistributionMode::Uniform => finite[rng.gen_range(0..finite.len())],
        DistributionMode::Normal => finite.iter().sum::<f64>() / finite.len() as f64,
    };
    Ok(chosen)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_picks_one_of_the_candidates() {
        let candidates = [-30.0, -12.0, -20.0];
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = [false; 3];
        for _ in 0..300 {
            let v = choose_final_volume(&candidates, DistributionMode::Uniform, &mut rng).unwrap();
            let idx = candidates.iter().position(|&c| c == v).expect("a candidate");
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s), "every candidate should come up");
    }

    #[test]
    fn normal_is_the_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        let v = choose_final_volume(&[-30.0, -10.0], DistributionMode::Normal, &mut rng).unwrap();
        assert!((v - (-20.0)).abs() < 1e-12);
    }

    #[test]
    fn single_candidate_is_returned_as_is() {
        let mut rng = StdRng::seed_from_u64(5);
        for mode in [DistributionMode::Uniform, DistributionMode::Normal] {
            let v = choose_final_volume(&[-17.5], mode, &mut rng).unwrap();
            assert_eq!(v, -17.5);
        }
    }

    #[test]
    fn silent_candidates_are_ignored() {
        let mut rng = StdRng::seed_from_u64(5);
        let v = choose_final_volume(&[f64::NEG_INFINITY, -24.0], DistributionMode::Normal, &mut rng)
            .unwrap();
        assert_eq!(v, -24.0);
    }

    #[test]
    fn all_silent_is_an_error() {
        let mut rng = StdRng::seed_from_u64(5);
        let err = choose_final_volume(&[f64::NEG_INFINITY], DistributionMode::Uniform, &mut rng)
            .unwrap_err();
        assert!(matches!(err, MergeError::InvalidArgument(_)));
        assert!(choose_final_volume(&[], DistributionMode::Normal, &mut rng).is_err());
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("uniform".parse::<DistributionMode>().unwrap(), DistributionMode::Uniform);
        assert_eq!(" Normal ".parse::<DistributionMode>().unwrap(), DistributionMode::Normal);
        assert!(matches!(
            "gaussian".parse::<DistributionMode>().unwrap_err(),
            MergeError::InvalidArgument(_)
        ));
    }

    #[test]
    fn default_mode_is_uniform() {
        assert_eq!(DistributionMode::default(), DistributionMode::Uniform);
        assert_eq!(DistributionMode::Normal.to_string(), "normal");
    }
}
