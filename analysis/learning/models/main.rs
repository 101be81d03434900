//! Estimators used by the pipeline.
//!
//! Supervised models implement [`Classifier`] or [`Regressor`] and are `Clone`
//! so model selection can refit fresh copies per fold. Clustering follows the
//! preprocessing convention instead: `KMeans::fit` returns a separate fitted
//! value.

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::Result;

/// Nearest-centroid clustering.
pub mod kmeans;
/// k-nearest-neighbours voting classifier.
pub mod knn;
/// Ordinary least squares.
pub mod linear;
/// CART decision tree.
pub mod tree;

pub use kmeans::{FittedKMeans, KMeans};
pub use knn::KNeighborsClassifier;
pub use linear::LinearRegression;
pub use tree::DecisionTreeClassifier;

/// Supervised model predicting one integer label per row.
pub trait Classifier {
    /// Learns from `x` (one sample per row) and labels `y`.
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()>;

    /// Predicts one label per row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>>;

    /// Class membership probabilities, one column per entry of [`Classifier::classes`].
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Sorted labels seen during fit; empty before fit.
    fn classes(&self) -> &[usize];
}

/// Supervised model predicting one real value per row.
pub trait Regressor {
    /// Learns from `x` (one sample per row) and targets `y`.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predicts one value per row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

pub(crate) fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

pub(crate) fn sorted_classes(y: &[usize]) -> Vec<usize> {
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}

/// Index of the largest count, preferring the earliest (smallest label) on ties.
pub(crate) fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}
