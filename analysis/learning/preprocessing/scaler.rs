use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Standardization settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardScaler;

impl StandardScaler {
    /// Learns per-column mean and population standard deviation.
    ///
    /// Columns with zero spread get a scale of 1 so they map to zero instead of
    /// dividing by zero.
    pub fn fit(&self, x: &Array2<f64>) -> Result<FittedScaler> {
        if x.nrows() == 0 {
            return Err(AnalysisError::EmptyInput("StandardScaler::fit"));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or(AnalysisError::EmptyInput("StandardScaler::fit"))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Ok(FittedScaler { mean, scale })
    }

    /// Fits on `x` and returns the fitted scaler together with transformed `x`.
    pub fn fit_transform(&self, x: &Array2<f64>) -> Result<(FittedScaler, Array2<f64>)> {
        let fitted = self.fit(x)?;
        let transformed = fitted.transform(x)?;
        Ok((fitted, transformed))
    }
}

/// Column statistics learned by [`StandardScaler::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    /// Per-column mean of the fitted data.
    pub mean: Array1<f64>,
    /// Per-column divisor.
    pub scale: Array1<f64>,
}

impl FittedScaler {
    /// Applies `(x - mean) / scale` column-wise.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        AnalysisError::ensure_len("FittedScaler::transform", self.mean.len(), x.ncols())?;
        Ok((x - &self.mean) / &self.scale)
    }

    /// Maps standardized values back to the original units.
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        AnalysisError::ensure_len("FittedScaler::inverse_transform", self.mean.len(), x.ncols())?;
        Ok(x * &self.scale + &self.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn fitted_data_has_zero_mean_unit_std() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 60.0], [6.0, 10.0]];
        let (_, scaled) = StandardScaler.fit_transform(&x).unwrap();
        for column in scaled.columns() {
            assert!(column.mean().unwrap().abs() < 1e-12);
            assert!((column.std(0.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rows_use_training_parameters() {
        let train = array![[0.0], [2.0]];
        let fitted = StandardScaler.fit(&train).unwrap();
        let test = fitted.transform(&array![[4.0]]).unwrap();
        assert!((test[[0, 0]] - 3.0).abs() < 1e-12);
        let back = fitted.inverse_transform(&test).unwrap();
        assert!((back[[0, 0]] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let fitted = StandardScaler.fit(&array![[5.0], [5.0]]).unwrap();
        assert_eq!(fitted.scale[0], 1.0);
        assert_eq!(fitted.transform(&array![[5.0]]).unwrap()[[0, 0]], 0.0);
    }

    #[test]
    fn column_count_must_match() {
        let fitted = StandardScaler.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            fitted.transform(&array![[1.0]]),
            Err(AnalysisError::ShapeMismatch { expected: 2, found: 1, .. })
        ));
    }
}
