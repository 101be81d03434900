use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{argmax_first, sorted_classes, squared_distance, Classifier};
use crate::error::{AnalysisError, Result};

/// Majority vote among the `n_neighbors` closest training rows.
///
/// Distances are Euclidean and every neighbour weighs the same. Equidistant
/// neighbours are taken in training order, and a tied vote goes to the smallest
/// label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNeighborsClassifier {
    n_neighbors: usize,
    #[serde(skip)]
    memory: Option<Memory>,
}

#[derive(Debug, Clone, PartialEq)]
struct Memory {
    x: Array2<f64>,
    y: Vec<usize>,
    classes: Vec<usize>,
}

impl KNeighborsClassifier {
    /// Unfitted classifier voting over `n_neighbors` neighbours.
    #[must_use]
    pub const fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            memory: None,
        }
    }

    /// Configured neighbour count.
    #[must_use]
    pub const fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    fn memory(&self) -> Result<&Memory> {
        self.memory
            .as_ref()
            .ok_or(AnalysisError::NotFitted("KNeighborsClassifier"))
    }

    /// Per-class vote counts of the neighbours of `row`.
    fn votes(memory: &Memory, k: usize, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut distances: Vec<(f64, usize)> = memory
            .x
            .rows()
            .into_iter()
            .enumerate()
            .map(|(idx, train)| (squared_distance(row, train), idx))
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut votes = vec![0.0; memory.classes.len()];
        for &(_, idx) in distances.iter().take(k) {
            if let Ok(slot) = memory.classes.binary_search(&memory.y[idx]) {
                votes[slot] += 1.0;
            }
        }
        votes
    }

    fn check_width(memory: &Memory, x: &Array2<f64>) -> Result<()> {
        AnalysisError::ensure_len("KNeighborsClassifier::predict", memory.x.ncols(), x.ncols())
    }
}

impl Classifier for KNeighborsClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        if x.nrows() == 0 {
            return Err(AnalysisError::EmptyInput("KNeighborsClassifier::fit"));
        }
        AnalysisError::ensure_len("KNeighborsClassifier::fit", x.nrows(), y.len())?;
        if self.n_neighbors == 0 || self.n_neighbors > x.nrows() {
            return Err(AnalysisError::invalid(
                "n_neighbors",
                format!(
                    "must lie in 1..={} for {} training rows, got {}",
                    x.nrows(),
                    x.nrows(),
                    self.n_neighbors
                ),
            ));
        }
        self.memory = Some(Memory {
            x: x.clone(),
            y: y.to_vec(),
            classes: sorted_classes(y),
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let memory = self.memory()?;
        Self::check_width(memory, x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let votes = Self::votes(memory, self.n_neighbors, row);
                memory.classes[argmax_first(&votes)]
            })
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let memory = self.memory()?;
        Self::check_width(memory, x)?;
        let mut proba = Array2::zeros((x.nrows(), memory.classes.len()));
        for (row, mut out) in x.rows().into_iter().zip(proba.rows_mut()) {
            let votes = Self::votes(memory, self.n_neighbors, row);
            for (slot, count) in out.iter_mut().zip(votes) {
                *slot = count / self.n_neighbors as f64;
            }
        }
        Ok(proba)
    }

    fn classes(&self) -> &[usize] {
        self.memory
            .as_ref()
            .map_or(&[][..], |memory| memory.classes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [5.0, 5.0],
            [5.1, 4.9],
            [4.8, 5.2]
        ];
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn predicts_nearest_blob() {
        let (x, y) = two_blobs();
        let mut knn = KNeighborsClassifier::new(3);
        knn.fit(&x, &y).unwrap();
        let pred = knn.predict(&array![[0.05, 0.05], [5.0, 5.1]]).unwrap();
        assert_eq!(pred, vec![0, 1]);
        assert_eq!(knn.classes(), &[0, 1]);
    }

    #[test]
    fn probabilities_are_vote_fractions() {
        let (x, y) = two_blobs();
        let mut knn = KNeighborsClassifier::new(4);
        knn.fit(&x, &y).unwrap();
        let proba = knn.predict_proba(&array![[0.0, 0.0]]).unwrap();
        assert!((proba[[0, 0]] - 0.75).abs() < 1e-12);
        assert!((proba[[0, 1]] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn tied_vote_goes_to_smallest_label() {
        let x = array![[0.0], [1.0], [3.0], [4.0]];
        let mut knn = KNeighborsClassifier::new(2);
        knn.fit(&x, &[2, 5, 5, 2]).unwrap();
        assert_eq!(knn.predict(&array![[0.5]]).unwrap(), vec![2]);
    }

    #[test]
    fn rejects_too_many_neighbours() {
        let (x, y) = two_blobs();
        let mut knn = KNeighborsClassifier::new(7);
        assert!(matches!(
            knn.fit(&x, &y),
            Err(AnalysisError::InvalidParameter { name: "n_neighbors", .. })
        ));
        assert!(matches!(
            knn.predict(&x),
            Err(AnalysisError::NotFitted(_))
        ));
    }
}
