//! Scoring helpers for classifiers, score-based rankings and regressors.

/// Accuracy, confusion matrix and the per-class report.
pub mod classification;
/// Receiver operating characteristic.
pub mod roc;
/// Regression errors.
pub mod regression;

pub use classification::{
    accuracy_score, confusion_matrix, ClassMetrics, ClassificationReport, ConfusionMatrix,
};
pub use regression::{mean_squared_error, r2_score};
pub use roc::{auc, roc_curve, RocCurve};
