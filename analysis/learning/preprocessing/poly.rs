use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Polynomial expansion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    /// Highest total degree of generated terms.
    pub degree: usize,
    /// Prepend a constant column of ones.
    pub include_bias: bool,
}

impl PolynomialFeatures {
    /// Expansion up to `degree` with a bias column.
    #[must_use]
    pub const fn new(degree: usize) -> Self {
        Self {
            degree,
            include_bias: true,
        }
    }

    /// Records the input width and the exponent vector of every output column.
    ///
    /// Columns are ordered by degree, and within a degree by the
    /// lexicographic order of the multiplied input indices.
    pub fn fit(&self, x: &Array2<f64>) -> Result<FittedPolynomial> {
        if self.degree == 0 {
            return Err(AnalysisError::invalid("degree", "must be at least 1"));
        }
        let n_input = x.ncols();
        if n_input == 0 {
            return Err(AnalysisError::EmptyInput("PolynomialFeatures::fit"));
        }
        let start = if self.include_bias { 0 } else { 1 };
        let mut powers = Vec::new();
        for degree in start..=self.degree {
            let mut combo = Vec::with_capacity(degree);
            push_combinations(n_input, degree, 0, &mut combo, &mut powers);
        }
        Ok(FittedPolynomial { n_input, powers })
    }

    /// Fits on `x` and returns the fitted expansion with transformed `x`.
    pub fn fit_transform(&self, x: &Array2<f64>) -> Result<(FittedPolynomial, Array2<f64>)> {
        let fitted = self.fit(x)?;
        let expanded = fitted.transform(x)?;
        Ok((fitted, expanded))
    }
}

fn push_combinations(
    n_input: usize,
    remaining: usize,
    first: usize,
    combo: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if remaining == 0 {
        let mut exponents = vec![0; n_input];
        for &idx in combo.iter() {
            exponents[idx] += 1;
        }
        out.push(exponents);
        return;
    }
    for idx in first..n_input {
        combo.push(idx);
        push_combinations(n_input, remaining - 1, idx, combo, out);
        combo.pop();
    }
}

/// Exponent table learned by [`PolynomialFeatures::fit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FittedPolynomial {
    /// Number of input columns seen during fit.
    pub n_input: usize,
    /// `powers[j][i]` is the exponent of input `i` in output column `j`.
    pub powers: Vec<Vec<usize>>,
}

impl FittedPolynomial {
    /// Number of generated columns.
    #[must_use]
    pub fn n_output(&self) -> usize {
        self.powers.len()
    }

    /// Evaluates every monomial on every row.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        AnalysisError::ensure_len("FittedPolynomial::transform", self.n_input, x.ncols())?;
        let mut out = Array2::zeros((x.nrows(), self.n_output()));
        for (row, mut out_row) in x.rows().into_iter().zip(out.rows_mut()) {
            for (slot, exponents) in out_row.iter_mut().zip(&self.powers) {
                *slot = row
                    .iter()
                    .zip(exponents)
                    .map(|(value, &power)| value.powi(power as i32))
                    .product();
            }
        }
        Ok(out)
    }

    /// Human-readable term names such as `1`, `x0`, `x0^2` or `x0 x1`.
    #[must_use]
    pub fn feature_names(&self, inputs: &[String]) -> Vec<String> {
        self.powers
            .iter()
            .map(|exponents| {
                let terms: Vec<String> = exponents
                    .iter()
                    .enumerate()
                    .filter(|(_, power)| **power > 0)
                    .map(|(idx, &power)| {
                        let name = inputs.get(idx).cloned().unwrap_or_else(|| format!("x{idx}"));
                        if power == 1 {
                            name
                        } else {
                            format!("{name}^{power}")
                        }
                    })
                    .collect();
                if terms.is_empty() {
                    "1".to_string()
                } else {
                    terms.join(" ")
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn degree_two_single_feature() {
        let (fitted, out) = PolynomialFeatures::new(2)
            .fit_transform(&array![[2.0], [-3.0]])
            .unwrap();
        assert_eq!(fitted.n_output(), 3);
        assert_eq!(out, array![[1.0, 2.0, 4.0], [1.0, -3.0, 9.0]]);
    }

    #[test]
    fn two_features_follow_combination_order() {
        let fitted = PolynomialFeatures::new(2).fit(&array![[1.0, 1.0]]).unwrap();
        assert_eq!(
            fitted.feature_names(&[]),
            vec!["1", "x0", "x1", "x0^2", "x0 x1", "x1^2"]
        );
        let out = fitted.transform(&array![[2.0, 3.0]]).unwrap();
        assert_eq!(out, array![[1.0, 2.0, 3.0, 4.0, 6.0, 9.0]]);
    }

    #[test]
    fn bias_can_be_dropped() {
        let poly = PolynomialFeatures {
            degree: 3,
            include_bias: false,
        };
        let fitted = poly.fit(&array![[1.0]]).unwrap();
        assert_eq!(fitted.feature_names(&["t".to_string()]), vec!["t", "t^2", "t^3"]);
    }

    #[test]
    fn zero_degree_is_rejected() {
        assert!(PolynomialFeatures::new(0).fit(&array![[1.0]]).is_err());
    }
}
