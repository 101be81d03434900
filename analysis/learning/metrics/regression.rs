use ndarray::Array1;

use crate::error::{AnalysisError, Result};

/// Mean of squared residuals.
pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_pair(y_true, y_pred, "mean_squared_error")?;
    Ok((y_true - y_pred).mapv(|r| r * r).mean().unwrap_or_default())
}

/// Coefficient of determination.
///
/// A constant `y_true` scores 1 when predicted exactly and 0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_pair(y_true, y_pred, "r2_score")?;
    let mean = y_true.mean().unwrap_or_default();
    let ss_res = (y_true - y_pred).mapv(|r| r * r).sum();
    let ss_tot = y_true.mapv(|v| (v - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

fn check_pair(y_true: &Array1<f64>, y_pred: &Array1<f64>, op: &'static str) -> Result<()> {
    if y_true.is_empty() {
        return Err(AnalysisError::EmptyInput(op));
    }
    AnalysisError::ensure_len(op, y_true.len(), y_pred.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn perfect_fit_scores_one() {
        let y = array![1.0, 2.0, 3.0];
        assert!((r2_score(&y, &y).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(mean_squared_error(&y, &y).unwrap(), 0.0);
    }

    #[test]
    fn mean_prediction_scores_zero() {
        let y = array![1.0, 2.0, 3.0];
        let pred = array![2.0, 2.0, 2.0];
        assert!(r2_score(&y, &pred).unwrap().abs() < 1e-12);
        assert!((mean_squared_error(&y, &pred).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }
}
