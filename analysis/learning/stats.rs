//! Descriptive statistics over a one-dimensional sample.
//!
//! `std_dev` is the population deviation (no degrees-of-freedom correction) and
//! `percentile` interpolates linearly between the two closest ranks.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64> {
    non_empty(values, "mean")?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value, averaging the two central values for even lengths.
pub fn median(values: &[f64]) -> Result<f64> {
    percentile(values, 50.0)
}

/// Most frequent value.
///
/// Ties are broken by the smallest value, so on continuous data where every
/// value is distinct this returns the minimum of the sample.
pub fn mode(values: &[f64]) -> Result<f64> {
    non_empty(values, "mode")?;
    let sorted = sorted(values);
    let mut best = (sorted[0], 0_usize);
    let mut idx = 0;
    while idx < sorted.len() {
        let value = sorted[idx];
        let run = sorted[idx..].iter().take_while(|&&v| v == value).count();
        if run > best.1 {
            best = (value, run);
        }
        idx += run;
    }
    Ok(best.0)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Result<f64> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(variance.sqrt())
}

/// `q`-th percentile with `q` in `[0, 100]`.
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    non_empty(values, "percentile")?;
    if !(0.0..=100.0).contains(&q) {
        return Err(AnalysisError::invalid(
            "q",
            format!("percentile must lie in [0, 100], got {q}"),
        ));
    }
    let sorted = sorted(values);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Summary printed by the statistics step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Sample size.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Mode with smallest-value tie-break.
    pub mode: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// 90th percentile.
    pub percentile_90: f64,
}

impl Summary {
    /// Computes every statistic of the summary.
    pub fn describe(values: &[f64]) -> Result<Self> {
        Ok(Self {
            count: values.len(),
            mean: mean(values)?,
            median: median(values)?,
            mode: mode(values)?,
            std_dev: std_dev(values)?,
            percentile_90: percentile(values, 90.0)?,
        })
    }
}

fn non_empty(values: &[f64], op: &'static str) -> Result<()> {
    if values.is_empty() {
        Err(AnalysisError::EmptyInput(op))
    } else {
        Ok(())
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn basic_moments() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values).unwrap() - 5.0).abs() < EPS);
        assert!((std_dev(&values).unwrap() - 2.0).abs() < EPS);
        assert!((median(&values).unwrap() - 4.5).abs() < EPS);
        assert!((mode(&values).unwrap() - 4.0).abs() < EPS);
    }

    #[test]
    fn mode_of_distinct_values_is_the_minimum() {
        let values = [3.3, -1.25, 8.0, 0.5];
        assert!((mode(&values).unwrap() + 1.25).abs() < EPS);
    }

    #[test]
    fn mode_tie_prefers_smallest() {
        let values = [5.0, 1.0, 5.0, 1.0, 3.0];
        assert!((mode(&values).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert!((percentile(&values, 90.0).unwrap() - 9.1).abs() < 1e-9);
        assert!((percentile(&values, 0.0).unwrap() - 1.0).abs() < EPS);
        assert!((percentile(&values, 100.0).unwrap() - 10.0).abs() < EPS);
    }

    #[test]
    fn empty_and_out_of_range_inputs_fail() {
        assert!(matches!(mean(&[]), Err(AnalysisError::EmptyInput("mean"))));
        assert!(matches!(
            percentile(&[1.0], 101.0),
            Err(AnalysisError::InvalidParameter { name: "q", .. })
        ));
    }

    #[test]
    fn summary_collects_all_fields() {
        let summary = Summary::describe(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert!((summary.median - 2.0).abs() < EPS);
        assert!((summary.percentile_90 - 2.8).abs() < 1e-9);
    }
}
