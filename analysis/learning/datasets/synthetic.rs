use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Parameters of the noisy linear regression set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSpec {
    /// Number of rows.
    pub samples: usize,
    /// True slope of the target.
    pub slope: f64,
    /// Features are drawn from `[0, feature_scale)`.
    pub feature_scale: f64,
    /// Standard deviation of the Gaussian noise.
    pub noise_scale: f64,
    /// Generator seed.
    pub seed: u64,
}

impl Default for LinearSpec {
    fn default() -> Self {
        Self {
            samples: 100,
            slope: 2.5,
            feature_scale: 10.0,
            noise_scale: 2.0,
            seed: 42,
        }
    }
}

/// Single-column regression features with a continuous target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSet {
    /// Feature matrix (`n × 1` for the generated set).
    pub features: Array2<f64>,
    /// Target value of each row.
    pub targets: Array1<f64>,
}

impl RegressionSet {
    /// Builds a set after checking that rows and targets line up.
    pub fn new(features: Array2<f64>, targets: Array1<f64>) -> Result<Self> {
        AnalysisError::ensure_len("regression set", features.nrows(), targets.len())?;
        Ok(Self { features, targets })
    }

    /// Number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }
}

/// Generates `target = slope * feature + noise`.
///
/// All features are drawn first and all noise values second, so the feature
/// column of a given seed does not depend on the noise parameters.
pub fn make_linear(spec: &LinearSpec) -> Result<RegressionSet> {
    if spec.samples == 0 {
        return Err(AnalysisError::EmptyInput("make_linear"));
    }
    if !spec.noise_scale.is_finite() || spec.noise_scale < 0.0 {
        return Err(AnalysisError::invalid(
            "noise_scale",
            format!("must be finite and non-negative, got {}", spec.noise_scale),
        ));
    }
    if !spec.feature_scale.is_finite() || spec.feature_scale <= 0.0 {
        return Err(AnalysisError::invalid(
            "feature_scale",
            format!("must be finite and positive, got {}", spec.feature_scale),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(spec.seed);
    let features: Array1<f64> = (0..spec.samples)
        .map(|_| rng.gen::<f64>() * spec.feature_scale)
        .collect();
    let noise: Array1<f64> = (0..spec.samples)
        .map(|_| {
            let draw: f64 = StandardNormal.sample(&mut rng);
            draw * spec.noise_scale
        })
        .collect();
    let targets = &features * spec.slope + &noise;
    let features = features.insert_axis(ndarray::Axis(1));
    RegressionSet::new(features, targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_data() {
        let spec = LinearSpec::default();
        let first = make_linear(&spec).unwrap();
        let second = make_linear(&spec).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.features.dim(), (100, 1));
        assert_eq!(first.targets.len(), 100);
    }

    #[test]
    fn features_stay_in_range() {
        let set = make_linear(&LinearSpec::default()).unwrap();
        assert!(set.features.iter().all(|&x| (0.0..10.0).contains(&x)));
    }

    #[test]
    fn zero_noise_gives_exact_line() {
        let spec = LinearSpec {
            noise_scale: 0.0,
            samples: 12,
            ..LinearSpec::default()
        };
        let set = make_linear(&spec).unwrap();
        for (x, y) in set.features.column(0).iter().zip(set.targets.iter()) {
            assert!((2.5 * x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_negative_noise() {
        let spec = LinearSpec {
            noise_scale: -1.0,
            ..LinearSpec::default()
        };
        assert!(matches!(
            make_linear(&spec),
            Err(AnalysisError::InvalidParameter { name: "noise_scale", .. })
        ));
    }
}
