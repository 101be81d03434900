#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

//! Reproducible analysis stack: descriptive statistics, classical estimators,
//! model selection, plotting and the pipeline tying them together.

/// Library error type.
#[path = "../error.rs"]
pub mod error;

/// Embedded and synthetic datasets.
#[path = "../datasets/main.rs"]
pub mod datasets;

/// Descriptive statistics.
#[path = "../stats.rs"]
pub mod stats;

/// Splits, folds and grid search.
#[path = "../model_selection/main.rs"]
pub mod model_selection;

/// Scaling and polynomial expansion.
#[path = "../preprocessing/main.rs"]
pub mod preprocessing;

/// Regressors, classifiers and clustering.
#[path = "../models/main.rs"]
pub mod models;

/// Classification, ranking and regression scores.
#[path = "../metrics/main.rs"]
pub mod metrics;

/// Owned figures and raster output.
#[path = "../plotting.rs"]
pub mod plotting;

/// Structured logging for pipeline runs.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Ordered analysis run.
#[path = "../pipeline/main.rs"]
pub mod pipeline;

/// Generator state capture and restore.
#[path = "../rng_state.rs"]
pub mod rng_state;

pub use datasets::{load_iris, make_linear, ClassificationSet, LinearSpec, RegressionSet};
pub use error::{AnalysisError, Result};
pub use pipeline::{AnalysisPipeline, AnalysisReport, PipelineConfig, RocOutcome};
pub use plotting::{Figure, ImageFormat};
pub use rng_state::{demonstrate, Generator, GeneratorState, StateDemo};
pub use telemetry::{AnalysisTelemetry, AnalysisTelemetryBuilder};
