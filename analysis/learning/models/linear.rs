use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::Regressor;
use crate::error::{AnalysisError, Result};

const CONSTANT_COLUMN_EPS: f64 = 1e-12;
const PIVOT_EPS: f64 = 1e-12;

/// Least-squares linear model with an intercept.
///
/// Inputs and targets are centred before solving, so a constant input column
/// (such as a polynomial bias term) carries no information and receives a zero
/// coefficient; the intercept absorbs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearRegression {
    /// Unfitted model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted coefficients, one per input column.
    #[must_use]
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    /// Fitted intercept (0 before fit).
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(AnalysisError::EmptyInput("LinearRegression::fit"));
        }
        AnalysisError::ensure_len("LinearRegression::fit", x.nrows(), y.len())?;

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or(AnalysisError::EmptyInput("LinearRegression::fit"))?;
        let y_mean = y.mean().unwrap_or_default();
        let xc = x - &x_mean;
        let yc = y - y_mean;

        let active: Vec<usize> = (0..x.ncols())
            .filter(|&col| xc.column(col).iter().any(|v| v.abs() > CONSTANT_COLUMN_EPS))
            .collect();

        let mut coefficients = Array1::<f64>::zeros(x.ncols());
        if !active.is_empty() {
            let design = xc.select(Axis(1), &active);
            let gram = design.t().dot(&design);
            let rhs = design.t().dot(&yc);
            let solution = solve(gram, rhs)?;
            for (slot, value) in active.iter().zip(solution.iter()) {
                coefficients[*slot] = *value;
            }
        }

        self.intercept = y_mean - x_mean.dot(&coefficients);
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(AnalysisError::NotFitted("LinearRegression"))?;
        AnalysisError::ensure_len("LinearRegression::predict", coefficients.len(), x.ncols())?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

/// Solves `a · v = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = b.len();
    let scale = a
        .diag()
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= PIVOT_EPS * scale {
            return Err(AnalysisError::SingularMatrix);
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut v = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * v[k]).sum();
        v[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::PolynomialFeatures;
    use ndarray::array;

    #[test]
    fn recovers_exact_plane() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 1.0], [3.0, 5.0], [1.5, -2.0]];
        let y = x.column(0).mapv(|v| 3.0 * v) + x.column(1).mapv(|v| -2.0 * v) + 0.5;
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let coefficients = model.coefficients().unwrap();
        assert!((coefficients[0] - 3.0).abs() < 1e-9);
        assert!((coefficients[1] + 2.0).abs() < 1e-9);
        assert!((model.intercept() - 0.5).abs() < 1e-9);
        let pred = model.predict(&array![[10.0, 10.0]]).unwrap();
        assert!((pred[0] - 10.5).abs() < 1e-9);
    }

    #[test]
    fn bias_column_gets_zero_coefficient() {
        let x = array![[-1.0], [0.0], [1.0], [2.0]];
        let y = x.column(0).mapv(|v| v * v - v + 4.0);
        let (_, expanded) = PolynomialFeatures::new(2).fit_transform(&x).unwrap();
        let mut model = LinearRegression::new();
        model.fit(&expanded, &y).unwrap();
        let coefficients = model.coefficients().unwrap();
        assert_eq!(coefficients[0], 0.0);
        assert!((coefficients[1] + 1.0).abs() < 1e-9);
        assert!((coefficients[2] - 1.0).abs() < 1e-9);
        assert!((model.intercept() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn duplicated_column_is_singular() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let y = array![1.0, 2.0, 3.0];
        let mut model = LinearRegression::new();
        assert!(matches!(model.fit(&x, &y), Err(AnalysisError::SingularMatrix)));
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(AnalysisError::NotFitted("LinearRegression"))
        ));
    }
}
