use ndarray::{Array2, ArrayView1, Axis};
use rand::{distributions::WeightedIndex, prelude::Distribution, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::squared_distance;
use crate::error::{AnalysisError, Result};

/// Lloyd's k-means with k-means++ seeding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters.
    pub n_clusters: usize,
    /// Iteration cap per initialisation.
    pub max_iter: usize,
    /// Convergence tolerance, relative to the mean per-column variance.
    pub tol: f64,
    /// Number of independent initialisations; the lowest inertia wins.
    pub n_init: usize,
    /// Seed of the initialisation generator.
    pub seed: u64,
}

impl KMeans {
    /// Default settings for `n_clusters` clusters.
    #[must_use]
    pub const fn new(n_clusters: usize, seed: u64) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 1,
            seed,
        }
    }

    /// Clusters the rows of `x`.
    pub fn fit(&self, x: &Array2<f64>) -> Result<FittedKMeans> {
        self.validate(x)?;
        let variance = x.var_axis(Axis(0), 0.0).mean().unwrap_or_default();
        let threshold = self.tol * variance;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut best: Option<FittedKMeans> = None;
        for _ in 0..self.n_init {
            let seeds = plus_plus(x, self.n_clusters, &mut rng);
            let run = self.lloyd(x, seeds, threshold);
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        best.ok_or(AnalysisError::invalid("n_init", "must be at least 1"))
    }

    fn validate(&self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(AnalysisError::EmptyInput("KMeans::fit"));
        }
        if self.n_clusters == 0 || self.n_clusters > x.nrows() {
            return Err(AnalysisError::invalid(
                "n_clusters",
                format!("must lie in 1..={}, got {}", x.nrows(), self.n_clusters),
            ));
        }
        if self.max_iter == 0 {
            return Err(AnalysisError::invalid("max_iter", "must be at least 1"));
        }
        if self.n_init == 0 {
            return Err(AnalysisError::invalid("n_init", "must be at least 1"));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(AnalysisError::invalid("tol", "must be finite and non-negative"));
        }
        Ok(())
    }

    fn lloyd(&self, x: &Array2<f64>, mut centroids: Array2<f64>, threshold: f64) -> FittedKMeans {
        let mut labels = assign(x, &centroids);
        let mut n_iter = 0;
        while n_iter < self.max_iter {
            n_iter += 1;
            let updated = recompute(x, &labels, &centroids);
            let shift: f64 = updated
                .rows()
                .into_iter()
                .zip(centroids.rows())
                .map(|(a, b)| squared_distance(a, b))
                .sum();
            centroids = updated;
            labels = assign(x, &centroids);
            if shift <= threshold {
                break;
            }
        }
        let inertia = inertia(x, &labels, &centroids);
        FittedKMeans {
            centroids,
            labels,
            inertia,
            n_iter,
        }
    }
}

/// Result of [`KMeans::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedKMeans {
    /// One centroid per row.
    pub centroids: Array2<f64>,
    /// Cluster index of each training row.
    pub labels: Vec<usize>,
    /// Sum of squared distances of rows to their centroid.
    pub inertia: f64,
    /// Lloyd iterations performed by the winning initialisation.
    pub n_iter: usize,
}

impl FittedKMeans {
    /// Assigns each row of `x` to its nearest centroid.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        AnalysisError::ensure_len("FittedKMeans::predict", self.centroids.ncols(), x.ncols())?;
        Ok(assign(x, &self.centroids))
    }

    /// Number of training rows in each cluster.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.nrows()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// k-means++: first centre uniform, later centres drawn proportionally to the
/// squared distance from the nearest chosen centre.
fn plus_plus(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n = x.nrows();
    let mut chosen = vec![rng.gen_range(0..n)];
    let mut nearest: Vec<f64> = x
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, x.row(chosen[0])))
        .collect();
    while chosen.len() < k {
        let next = match WeightedIndex::new(&nearest) {
            Ok(weights) => weights.sample(rng),
            Err(_) => rng.gen_range(0..n),
        };
        chosen.push(next);
        let centre = x.row(next);
        for (slot, row) in nearest.iter_mut().zip(x.rows()) {
            *slot = slot.min(squared_distance(row, centre));
        }
    }
    x.select(Axis(0), &chosen)
}

fn nearest_centroid(row: ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.rows().into_iter().enumerate() {
        let distance = squared_distance(row, centroid);
        if distance < best.1 {
            best = (idx, distance);
        }
    }
    best
}

fn assign(x: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    x.rows()
        .into_iter()
        .map(|row| nearest_centroid(row, centroids).0)
        .collect()
}

/// Mean of each cluster's rows. An empty cluster takes over the row lying
/// farthest from its current centroid.
fn recompute(x: &Array2<f64>, labels: &[usize], previous: &Array2<f64>) -> Array2<f64> {
    let k = previous.nrows();
    let mut sums = Array2::<f64>::zeros(previous.raw_dim());
    let mut counts = vec![0_usize; k];
    for (row, &label) in x.rows().into_iter().zip(labels) {
        let mut target = sums.row_mut(label);
        target += &row;
        counts[label] += 1;
    }
    let mut taken = Vec::new();
    for cluster in 0..k {
        if counts[cluster] > 0 {
            let count = counts[cluster] as f64;
            sums.row_mut(cluster).mapv_inplace(|v| v / count);
            continue;
        }
        let farthest = x
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !taken.contains(idx))
            .map(|(idx, row)| (idx, squared_distance(row, previous.row(labels[idx]))))
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map_or(0, |(idx, _)| idx);
        taken.push(farthest);
        sums.row_mut(cluster).assign(&x.row(farthest));
    }
    sums
}

fn inertia(x: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> f64 {
    x.rows()
        .into_iter()
        .zip(labels)
        .map(|(row, &label)| squared_distance(row, centroids.row(label)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn three_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.3],
            [10.0, 10.0],
            [10.2, 9.9],
            [9.8, 10.1],
            [0.0, 20.0],
            [0.3, 19.8],
            [-0.2, 20.1]
        ]
    }

    #[test]
    fn recovers_separated_blobs() {
        let x = three_blobs();
        let fitted = KMeans::new(3, 42).fit(&x).unwrap();
        assert_eq!(fitted.cluster_sizes(), vec![3, 3, 3]);
        for blob in 0..3 {
            let label = fitted.labels[blob * 3];
            assert!(fitted.labels[blob * 3..blob * 3 + 3].iter().all(|&l| l == label));
        }
        assert!(fitted.inertia < 1.0);
        assert_eq!(fitted.predict(&array![[10.1, 10.0]]).unwrap()[0], fitted.labels[3]);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let x = three_blobs();
        let config = KMeans {
            n_init: 4,
            ..KMeans::new(2, 7)
        };
        assert_eq!(config.fit(&x).unwrap(), config.fit(&x).unwrap());
    }

    #[test]
    fn duplicate_points_still_fill_every_cluster() {
        let x = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [2.0, 2.0]];
        let fitted = KMeans::new(3, 0).fit(&x).unwrap();
        assert_eq!(fitted.centroids.nrows(), 3);
        assert_eq!(fitted.labels.len(), 4);
    }

    #[test]
    fn rejects_more_clusters_than_rows() {
        let x = array![[1.0], [2.0]];
        assert!(matches!(
            KMeans::new(3, 0).fit(&x),
            Err(AnalysisError::InvalidParameter { name: "n_clusters", .. })
        ));
    }
}
