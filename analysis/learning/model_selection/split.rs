use ndarray::{Array1, Array2, Axis};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Disjoint row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    /// Training rows.
    pub train: Vec<usize>,
    /// Held-out rows.
    pub test: Vec<usize>,
}

/// Shuffles `0..n_rows` with a seeded generator and holds out the first
/// `ceil(test_size * n_rows)` rows of the permutation.
pub fn train_test_split(n_rows: usize, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if n_rows == 0 {
        return Err(AnalysisError::EmptyInput("train_test_split"));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(AnalysisError::invalid(
            "test_size",
            format!("must lie strictly between 0 and 1, got {test_size}"),
        ));
    }
    let n_test = (test_size * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(AnalysisError::invalid(
            "test_size",
            format!("{test_size} of {n_rows} rows leaves an empty partition"),
        ));
    }

    let mut permutation: Vec<usize> = (0..n_rows).collect();
    permutation.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let train = permutation.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: permutation,
    })
}

/// Copies the selected rows of a feature matrix.
#[must_use]
pub fn take_rows(x: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    x.select(Axis(0), rows)
}

/// Copies the selected entries of a target vector.
#[must_use]
pub fn take_values(y: &Array1<f64>, rows: &[usize]) -> Array1<f64> {
    y.select(Axis(0), rows)
}

/// Copies the selected entries of a label slice.
#[must_use]
pub fn take_items<T: Clone>(items: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&row| items[row].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn sizes_follow_test_fraction() {
        let iris = train_test_split(150, 0.2, 42).unwrap();
        assert_eq!((iris.train.len(), iris.test.len()), (120, 30));
        let regression = train_test_split(100, 0.2, 42).unwrap();
        assert_eq!((regression.train.len(), regression.test.len()), (80, 20));
    }

    #[test]
    fn partitions_are_disjoint_and_cover_all_rows() {
        let split = train_test_split(37, 0.3, 1).unwrap();
        let train: BTreeSet<_> = split.train.iter().copied().collect();
        let test: BTreeSet<_> = split.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 37);
        assert_eq!(train.union(&test).count(), 37);
    }

    #[test]
    fn seed_controls_permutation() {
        assert_eq!(
            train_test_split(50, 0.2, 9).unwrap(),
            train_test_split(50, 0.2, 9).unwrap()
        );
        assert_ne!(
            train_test_split(50, 0.2, 9).unwrap(),
            train_test_split(50, 0.2, 10).unwrap()
        );
    }

    #[test]
    fn degenerate_fractions_are_rejected() {
        assert!(train_test_split(10, 0.0, 0).is_err());
        assert!(train_test_split(10, 1.0, 0).is_err());
        assert!(train_test_split(1, 0.5, 0).is_err());
    }

    #[test]
    fn take_helpers_follow_index_order() {
        let x = ndarray::array![[0.0], [1.0], [2.0]];
        assert_eq!(take_rows(&x, &[2, 0]), ndarray::array![[2.0], [0.0]]);
        assert_eq!(take_items(&['a', 'b', 'c'], &[1, 1]), vec!['b', 'b']);
        let y = ndarray::array![5.0, 6.0, 7.0];
        assert_eq!(take_values(&y, &[1]), ndarray::array![6.0]);
    }
}
