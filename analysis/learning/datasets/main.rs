//! Fixed and synthetic datasets consumed by the pipeline.

/// Embedded iris measurements.
pub mod iris;
/// Seeded synthetic regression data.
pub mod synthetic;

pub use iris::{load_iris, parse_classification_csv, ClassificationSet};
pub use synthetic::{make_linear, LinearSpec, RegressionSet};
