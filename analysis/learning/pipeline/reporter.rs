use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    metrics::{ClassificationReport, ConfusionMatrix},
    model_selection::GridSearchResult,
    stats::Summary,
};

/// Train/test row counts of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    /// Rows used for fitting.
    pub train: usize,
    /// Rows held out.
    pub test: usize,
}

/// Polynomial regression fit and its held-out error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionOutcome {
    /// Names of the expanded columns, e.g. `1`, `x`, `x^2`.
    pub terms: Vec<String>,
    /// One coefficient per expanded column.
    pub coefficients: Vec<f64>,
    /// Fitted intercept.
    pub intercept: f64,
    /// Mean squared error on the test partition.
    pub test_mse: f64,
    /// Coefficient of determination on the test partition.
    pub test_r2: f64,
}

/// KNN evaluation on the classification test partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnOutcome {
    /// Neighbour count used.
    pub n_neighbors: usize,
    /// Confusion matrix of the test predictions.
    pub confusion: ConfusionMatrix,
    /// Per-class report of the test predictions.
    pub report: ClassificationReport,
    /// Stratified cross-validation accuracy on the train partition.
    pub cv_scores: Vec<f64>,
    /// Mean of `cv_scores`.
    pub cv_mean: f64,
}

/// Decision tree evaluation on the classification test partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeOutcome {
    /// Per-class report of the test predictions.
    pub report: ClassificationReport,
    /// Depth of the fitted tree.
    pub depth: usize,
    /// Leaves of the fitted tree.
    pub n_leaves: usize,
}

/// Result of the two-class ROC step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RocOutcome {
    /// The label set was not binary; nothing was computed or written.
    Skipped {
        /// Distinct labels in the classification set.
        n_classes: usize,
    },
    /// Curve computed from the KNN positive-class probabilities.
    Computed {
        /// Label treated as positive.
        positive_label: usize,
        /// Area under the curve.
        auc: f64,
        /// Number of curve points.
        points: usize,
    },
}

/// Clustering of the unscaled classification features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterOutcome {
    /// Rows per cluster.
    pub sizes: Vec<usize>,
    /// Within-cluster sum of squares.
    pub inertia: f64,
    /// Lloyd iterations run.
    pub n_iter: usize,
    /// Centroid coordinates, one vector per cluster.
    pub centroids: Vec<Vec<f64>>,
}

/// Everything a pipeline run computed and wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Identifier of the run, shared with its log records.
    pub run_id: Uuid,
    /// Statistics of the regression targets.
    pub summary: Summary,
    /// Classification partition sizes.
    pub classification_split: SplitSizes,
    /// Regression partition sizes.
    pub regression_split: SplitSizes,
    /// Polynomial regression step.
    pub regression: RegressionOutcome,
    /// KNN step.
    pub knn: KnnOutcome,
    /// Decision tree step.
    pub tree: TreeOutcome,
    /// Grid search over neighbour counts.
    pub grid: GridSearchResult<usize>,
    /// ROC step.
    pub roc: RocOutcome,
    /// Clustering step.
    pub clustering: ClusterOutcome,
    /// Plot files written, in order.
    pub files: Vec<PathBuf>,
}

impl AnalysisReport {
    /// Console rendering of the run. The run id is left out so repeated runs
    /// print the same text.
    #[must_use]
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(out, "Mean: {}, Median: {}, Mode: {}", s.mean, s.median, s.mode)?;
        writeln!(
            out,
            "Standard Deviation: {}, 90th Percentile: {}",
            s.std_dev, s.percentile_90
        )?;
        writeln!(
            out,
            "Split: classification {}/{}, regression {}/{}",
            self.classification_split.train,
            self.classification_split.test,
            self.regression_split.train,
            self.regression_split.test
        )?;

        let r = &self.regression;
        let terms: Vec<String> = r
            .terms
            .iter()
            .zip(&r.coefficients)
            .map(|(term, coef)| format!("{term}: {coef:.4}"))
            .collect();
        writeln!(
            out,
            "Polynomial Regression: intercept {:.4}, {}",
            r.intercept,
            terms.join(", ")
        )?;
        writeln!(out, "Test MSE: {:.4}, R^2: {:.4}", r.test_mse, r.test_r2)?;

        writeln!(out, "Confusion Matrix:")?;
        writeln!(out, "{}", self.knn.confusion)?;
        writeln!(out, "Classification Report:")?;
        writeln!(out, "{}", self.knn.report)?;
        let scores: Vec<String> = self.knn.cv_scores.iter().map(|v| format!("{v:.8}")).collect();
        writeln!(out, "Cross-Validation Scores: [{}]", scores.join(" "))?;
        writeln!(out, "Mean CV Score: {}", self.knn.cv_mean)?;

        writeln!(out, "Decision Tree Classification Report:")?;
        writeln!(out, "{}", self.tree.report)?;
        writeln!(
            out,
            "Decision Tree: depth {}, {} leaves",
            self.tree.depth, self.tree.n_leaves
        )?;

        writeln!(out, "Best KNN Parameter: n_neighbors = {}", self.grid.best)?;
        let grid: Vec<String> = self
            .grid
            .results
            .iter()
            .map(|c| format!("{}={:.4}", c.candidate, c.mean_score))
            .collect();
        writeln!(out, "Grid Scores: {}", grid.join(", "))?;

        match &self.roc {
            RocOutcome::Skipped { n_classes } => {
                writeln!(out, "ROC: skipped ({n_classes} classes)")?;
            }
            RocOutcome::Computed {
                positive_label,
                auc,
                ..
            } => writeln!(out, "ROC AUC (positive class {positive_label}): {auc:.2}")?,
        }

        writeln!(
            out,
            "K-Means: sizes {:?}, inertia {:.4}",
            self.clustering.sizes, self.clustering.inertia
        )?;
        for file in &self.files {
            writeln!(out, "Saved {}", file.display())?;
        }
        Ok(())
    }
}
