use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::datasets::LinearSpec;

/// Every knob of a pipeline run. Missing fields take the defaults below, which
/// reproduce the reference run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed shared by both train/test splits and the clustering initialisation.
    pub seed: u64,
    /// Fraction of rows held out for testing.
    pub test_size: f64,
    /// Degree of the polynomial regression expansion.
    pub poly_degree: usize,
    /// Neighbour count of the primary KNN classifier.
    pub n_neighbors: usize,
    /// Cross-validation folds for scoring and grid search.
    pub cv_folds: usize,
    /// Neighbour counts tried by the grid search.
    pub neighbor_grid: Vec<usize>,
    /// Depth limit of the decision tree; unlimited when `None`.
    pub tree_max_depth: Option<usize>,
    /// Number of k-means clusters.
    pub n_clusters: usize,
    /// Directory receiving every plot.
    pub output_dir: PathBuf,
    /// JPEG file of the regression scatter.
    pub regression_plot: String,
    /// PNG file of the ROC curve, written only for two-class data.
    pub roc_plot: String,
    /// PNG files receiving the clustering scatter; each gets the same figure.
    pub cluster_plots: Vec<String>,
    /// Synthetic regression set parameters.
    pub regression: LinearSpec,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_size: 0.2,
            poly_degree: 2,
            n_neighbors: 5,
            cv_folds: 5,
            neighbor_grid: vec![3, 5, 7, 9],
            tree_max_depth: None,
            n_clusters: 3,
            output_dir: PathBuf::from("."),
            regression_plot: "regression.jpg".into(),
            roc_plot: "roc.png".into(),
            cluster_plots: vec!["clusters.png".into(), "clusters_copy.png".into()],
            regression: LinearSpec::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no step could run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            bail!("test_size must lie strictly between 0 and 1, got {}", self.test_size);
        }
        if self.neighbor_grid.is_empty() {
            bail!("neighbor_grid must list at least one candidate");
        }
        if self.cluster_plots.is_empty() {
            bail!("cluster_plots must name at least one file");
        }
        Ok(())
    }

    /// Location of a plot file inside the output directory.
    #[must_use]
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
