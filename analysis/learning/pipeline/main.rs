//! The end-to-end analysis run.
//!
//! [`AnalysisPipeline::run`] executes its steps strictly in order: statistics
//! over the regression targets, train/test splits, scaling, polynomial
//! regression, KNN with cross-validation, a decision tree, a grid search over
//! neighbour counts, the two-class ROC curve and k-means clustering. Every
//! transform is fitted on a training partition only. The first failing step
//! aborts the run with the step named in the error context.

use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2};
use plotters::prelude::{RGBColor, BLUE, RED};
use serde_json::{json, Value};
use shared_logging::LogLevel;
use uuid::Uuid;

use crate::{
    datasets::{ClassificationSet, RegressionSet},
    metrics::{auc, confusion_matrix, mean_squared_error, r2_score, roc_curve, ClassificationReport},
    model_selection::{
        cross_val_score, take_items, take_rows, take_values, train_test_split, GridSearch,
        GridSearchResult, SplitIndices, StratifiedKFold,
    },
    models::{Classifier, DecisionTreeClassifier, KMeans, KNeighborsClassifier, LinearRegression, Regressor},
    plotting::{category_color, Figure, ImageFormat, LegendPosition},
    preprocessing::{PolynomialFeatures, StandardScaler},
    stats::Summary,
    telemetry::AnalysisTelemetry,
};

/// Serde-backed run settings.
pub mod config;
/// Report types and their console rendering.
pub mod reporter;

pub use config::PipelineConfig;
pub use reporter::{
    AnalysisReport, ClusterOutcome, KnnOutcome, RegressionOutcome, RocOutcome, SplitSizes,
    TreeOutcome,
};

const DIAGONAL_GRAY: RGBColor = RGBColor(128, 128, 128);

/// Scaled classification partitions.
struct ClassificationData<'a> {
    set: &'a ClassificationSet,
    x_train: Array2<f64>,
    x_test: Array2<f64>,
    y_train: Vec<usize>,
    y_test: Vec<usize>,
}

/// Scaled regression partitions.
struct RegressionData {
    x_train: Array2<f64>,
    x_test: Array2<f64>,
    y_train: Array1<f64>,
    y_test: Array1<f64>,
}

/// Runs the analysis steps under one configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPipeline {
    config: PipelineConfig,
    telemetry: Option<AnalysisTelemetry>,
}

impl AnalysisPipeline {
    /// Pipeline without telemetry.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            telemetry: None,
        }
    }

    /// Attaches a structured log sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: AnalysisTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Executes every step and collects the printed quantities and written
    /// files.
    pub fn run(
        &self,
        classification: &ClassificationSet,
        regression: &RegressionSet,
    ) -> Result<AnalysisReport> {
        let config = &self.config;
        config.validate()?;
        fs::create_dir_all(&config.output_dir).with_context(|| {
            format!("creating output directory {}", config.output_dir.display())
        })?;
        let run_id = self
            .telemetry
            .as_ref()
            .map_or_else(Uuid::new_v4, AnalysisTelemetry::run_id);
        self.log(
            LogLevel::Info,
            "pipeline.start",
            json!({
                "classification_rows": classification.n_samples(),
                "regression_rows": regression.n_samples(),
                "seed": config.seed,
            }),
        );

        let summary = Summary::describe(&regression.targets.to_vec())
            .context("describing regression targets")?;
        self.log(LogLevel::Info, "pipeline.statistics", json!(summary));

        let class_split = train_test_split(classification.n_samples(), config.test_size, config.seed)
            .context("splitting classification set")?;
        let reg_split = train_test_split(regression.n_samples(), config.test_size, config.seed)
            .context("splitting regression set")?;
        self.log(
            LogLevel::Info,
            "pipeline.split",
            json!({
                "classification": [class_split.train.len(), class_split.test.len()],
                "regression": [reg_split.train.len(), reg_split.test.len()],
            }),
        );

        let class_data = scale_classification(classification, &class_split)?;
        let reg_data = scale_regression(regression, &reg_split)?;

        let mut files = Vec::new();
        let regression_outcome = self.regression_step(&reg_data, &mut files)?;
        let (knn_outcome, knn) = self.knn_step(&class_data)?;
        let tree_outcome = self.tree_step(&class_data)?;
        let grid = self.grid_step(&class_data)?;
        let roc = self.roc_step(&class_data, &knn, &mut files)?;
        let clustering = self.cluster_step(classification, &mut files)?;

        self.log(
            LogLevel::Info,
            "pipeline.complete",
            json!({ "files": files.len() }),
        );
        Ok(AnalysisReport {
            run_id,
            summary,
            classification_split: sizes(&class_split),
            regression_split: sizes(&reg_split),
            regression: regression_outcome,
            knn: knn_outcome,
            tree: tree_outcome,
            grid,
            roc,
            clustering,
            files,
        })
    }

    fn regression_step(
        &self,
        data: &RegressionData,
        files: &mut Vec<PathBuf>,
    ) -> Result<RegressionOutcome> {
        let config = &self.config;
        let expansion = PolynomialFeatures::new(config.poly_degree)
            .fit(&data.x_train)
            .context("fitting polynomial expansion")?;
        let train_poly = expansion.transform(&data.x_train)?;
        let test_poly = expansion.transform(&data.x_test)?;

        let mut model = LinearRegression::new();
        model
            .fit(&train_poly, &data.y_train)
            .context("fitting polynomial regression")?;
        let predicted = model.predict(&test_poly)?;

        let feature: Vec<f64> = data.x_test.column(0).to_vec();
        let figure = Figure::new("Polynomial Regression")
            .axes("Feature", "Target")
            .scatter(
                feature.iter().copied().zip(data.y_test.iter().copied()),
                BLUE,
                Some("Actual"),
            )
            .scatter(
                feature.iter().copied().zip(predicted.iter().copied()),
                RED,
                Some("Predicted"),
            );
        let path = config.output_path(&config.regression_plot);
        figure
            .save(&path, ImageFormat::Jpeg)
            .with_context(|| format!("saving regression plot {}", path.display()))?;
        files.push(path);

        let outcome = RegressionOutcome {
            terms: expansion.feature_names(&["x".to_string()]),
            coefficients: model.coefficients().map(|c| c.to_vec()).unwrap_or_default(),
            intercept: model.intercept(),
            test_mse: mean_squared_error(&data.y_test, &predicted)?,
            test_r2: r2_score(&data.y_test, &predicted)?,
        };
        self.log(
            LogLevel::Info,
            "pipeline.regression",
            json!({ "mse": outcome.test_mse, "r2": outcome.test_r2 }),
        );
        Ok(outcome)
    }

    fn knn_step(&self, data: &ClassificationData<'_>) -> Result<(KnnOutcome, KNeighborsClassifier)> {
        let n_neighbors = self.config.n_neighbors;
        let mut knn = KNeighborsClassifier::new(n_neighbors);
        knn.fit(&data.x_train, &data.y_train)
            .context("fitting k-nearest-neighbours")?;
        let predicted = knn.predict(&data.x_test)?;
        let confusion = confusion_matrix(&data.y_test, &predicted)?;
        let report = ClassificationReport::with_names(&data.y_test, &predicted, |label| {
            data.set.target_name(label)
        })?;

        let folds = StratifiedKFold {
            n_splits: self.config.cv_folds,
        };
        let cv_scores = cross_val_score(
            &KNeighborsClassifier::new(n_neighbors),
            &data.x_train,
            &data.y_train,
            &folds,
        )
        .context("cross-validating k-nearest-neighbours")?;
        let cv_mean = cv_scores.iter().sum::<f64>() / cv_scores.len() as f64;
        self.log(
            LogLevel::Info,
            "pipeline.knn",
            json!({ "accuracy": report.accuracy, "cv_mean": cv_mean }),
        );
        Ok((
            KnnOutcome {
                n_neighbors,
                confusion,
                report,
                cv_scores,
                cv_mean,
            },
            knn,
        ))
    }

    fn tree_step(&self, data: &ClassificationData<'_>) -> Result<TreeOutcome> {
        let mut tree = self
            .config
            .tree_max_depth
            .map_or_else(DecisionTreeClassifier::new, DecisionTreeClassifier::with_max_depth);
        tree.fit(&data.x_train, &data.y_train)
            .context("fitting decision tree")?;
        let predicted = tree.predict(&data.x_test)?;
        let report = ClassificationReport::with_names(&data.y_test, &predicted, |label| {
            data.set.target_name(label)
        })?;
        let outcome = TreeOutcome {
            report,
            depth: tree.depth().unwrap_or_default(),
            n_leaves: tree.n_leaves().unwrap_or_default(),
        };
        self.log(
            LogLevel::Info,
            "pipeline.tree",
            json!({ "accuracy": outcome.report.accuracy, "depth": outcome.depth }),
        );
        Ok(outcome)
    }

    fn grid_step(&self, data: &ClassificationData<'_>) -> Result<GridSearchResult<usize>> {
        let folds = StratifiedKFold {
            n_splits: self.config.cv_folds,
        };
        let result = GridSearch::new(self.config.neighbor_grid.clone())?
            .fit(
                |&k| KNeighborsClassifier::new(k),
                &data.x_train,
                &data.y_train,
                &folds,
            )
            .context("grid searching n_neighbors")?;
        self.log(
            LogLevel::Info,
            "pipeline.grid_search",
            json!({ "best": result.best, "best_score": result.best_score }),
        );
        Ok(result)
    }

    fn roc_step(
        &self,
        data: &ClassificationData<'_>,
        knn: &KNeighborsClassifier,
        files: &mut Vec<PathBuf>,
    ) -> Result<RocOutcome> {
        let classes = data.set.classes();
        if classes.len() != 2 {
            self.log(
                LogLevel::Debug,
                "pipeline.roc_skipped",
                json!({ "n_classes": classes.len() }),
            );
            return Ok(RocOutcome::Skipped {
                n_classes: classes.len(),
            });
        }

        let positive_label = classes[1];
        let Some(column) = knn.classes().iter().position(|&c| c == positive_label) else {
            bail!("training partition holds no rows of class {positive_label}");
        };
        let proba = knn.predict_proba(&data.x_test)?;
        let scores = proba.column(column).to_vec();
        let curve = roc_curve(&data.y_test, &scores, positive_label).context("computing ROC curve")?;
        let area = auc(&curve.fpr, &curve.tpr)?;

        let label = format!("ROC curve (area = {area:.2})");
        let figure = Figure::new("Receiver Operating Characteristic")
            .axes("False Positive Rate", "True Positive Rate")
            .ranges(0.0..1.0, 0.0..1.05)
            .legend(LegendPosition::LowerRight)
            .line(
                curve.fpr.iter().copied().zip(curve.tpr.iter().copied()),
                BLUE,
                false,
                Some(&label),
            )
            .line([(0.0, 0.0), (1.0, 1.0)], DIAGONAL_GRAY, true, None);
        let path = self.config.output_path(&self.config.roc_plot);
        figure
            .save(&path, ImageFormat::Png)
            .with_context(|| format!("saving ROC plot {}", path.display()))?;
        files.push(path);

        self.log(LogLevel::Info, "pipeline.roc", json!({ "auc": area }));
        Ok(RocOutcome::Computed {
            positive_label,
            auc: area,
            points: curve.fpr.len(),
        })
    }

    fn cluster_step(
        &self,
        set: &ClassificationSet,
        files: &mut Vec<PathBuf>,
    ) -> Result<ClusterOutcome> {
        let fitted = KMeans::new(self.config.n_clusters, self.config.seed)
            .fit(&set.features)
            .context("clustering classification features")?;
        let k = fitted.centroids.nrows();
        let figure = Figure::new("K-Means Clustering")
            .axes("Feature 1", "Feature 2")
            .colored_scatter(set.features.rows().into_iter().zip(&fitted.labels).map(
                |(row, &label)| {
                    let y = row.get(1).copied().unwrap_or_default();
                    (row[0], y, category_color(label, k))
                },
            ));
        for name in &self.config.cluster_plots {
            let path = self.config.output_path(name);
            figure
                .save(&path, ImageFormat::Png)
                .with_context(|| format!("saving cluster plot {}", path.display()))?;
            files.push(path);
        }

        let outcome = ClusterOutcome {
            sizes: fitted.cluster_sizes(),
            inertia: fitted.inertia,
            n_iter: fitted.n_iter,
            centroids: fitted.centroids.rows().into_iter().map(|c| c.to_vec()).collect(),
        };
        self.log(
            LogLevel::Info,
            "pipeline.kmeans",
            json!({ "sizes": outcome.sizes, "inertia": outcome.inertia }),
        );
        Ok(outcome)
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, message, metadata);
        }
    }
}

fn scale_classification<'a>(
    set: &'a ClassificationSet,
    split: &SplitIndices,
) -> Result<ClassificationData<'a>> {
    let (scaler, x_train) = StandardScaler
        .fit_transform(&take_rows(&set.features, &split.train))
        .context("scaling classification features")?;
    let x_test = scaler.transform(&take_rows(&set.features, &split.test))?;
    Ok(ClassificationData {
        set,
        x_train,
        x_test,
        y_train: take_items(&set.targets, &split.train),
        y_test: take_items(&set.targets, &split.test),
    })
}

fn scale_regression(set: &RegressionSet, split: &SplitIndices) -> Result<RegressionData> {
    let (scaler, x_train) = StandardScaler
        .fit_transform(&take_rows(&set.features, &split.train))
        .context("scaling regression features")?;
    let x_test = scaler.transform(&take_rows(&set.features, &split.test))?;
    Ok(RegressionData {
        x_train,
        x_test,
        y_train: take_values(&set.targets, &split.train),
        y_test: take_values(&set.targets, &split.test),
    })
}

const fn sizes(split: &SplitIndices) -> SplitSizes {
    SplitSizes {
        train: split.train.len(),
        test: split.test.len(),
    }
}
