use std::{collections::BTreeSet, fmt};

use indexmap::IndexMap;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

const REPORT_DIGITS: usize = 2;

/// Fraction of predictions equal to the true label.
pub fn accuracy_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    check_pair(y_true, y_pred, "accuracy_score")?;
    let hits = y_true
        .iter()
        .zip(y_pred)
        .filter(|(truth, pred)| truth == pred)
        .count();
    Ok(hits as f64 / y_true.len() as f64)
}

/// Label-by-label tally of predictions: rows are true labels, columns are
/// predicted labels, both ordered as `labels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Label order of rows and columns.
    pub labels: Vec<usize>,
    /// `counts[[i, j]]` samples of `labels[i]` predicted as `labels[j]`.
    pub counts: Array2<usize>,
}

impl ConfusionMatrix {
    /// Number of correctly classified samples.
    #[must_use]
    pub fn trace(&self) -> usize {
        self.counts.diag().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .counts
            .iter()
            .map(|count| count.to_string().len())
            .max()
            .unwrap_or(1);
        let rows = self.counts.nrows();
        for (idx, row) in self.counts.rows().into_iter().enumerate() {
            f.write_str(if idx == 0 { "[[" } else { " [" })?;
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>width$}")).collect();
            f.write_str(&cells.join(" "))?;
            f.write_str(if idx + 1 == rows { "]]" } else { "]\n" })?;
        }
        Ok(())
    }
}

/// Builds the confusion matrix over the sorted union of observed labels.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize]) -> Result<ConfusionMatrix> {
    check_pair(y_true, y_pred, "confusion_matrix")?;
    let labels = union_labels(y_true, y_pred);
    let mut counts = Array2::zeros((labels.len(), labels.len()));
    for (truth, pred) in y_true.iter().zip(y_pred) {
        let row = position(&labels, *truth);
        let col = position(&labels, *pred);
        counts[[row, col]] += 1;
    }
    Ok(ConfusionMatrix { labels, counts })
}

/// Precision, recall, F1 and support of one class or one average row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// True positives over predicted positives (0 when nothing was predicted).
    pub precision: f64,
    /// True positives over actual positives (0 when the class is absent).
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Number of true samples of the class.
    pub support: usize,
}

/// Per-class precision/recall/F1 table with accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Rows keyed by class display name, in label order.
    pub classes: IndexMap<String, ClassMetrics>,
    /// Overall accuracy.
    pub accuracy: f64,
    /// Unweighted mean over classes.
    pub macro_avg: ClassMetrics,
    /// Support-weighted mean over classes.
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Builds a report naming each class by its numeric label.
    pub fn new(y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        Self::with_names(y_true, y_pred, |label| label.to_string())
    }

    /// Builds a report naming each class through `name_of`. Two labels mapped
    /// to the same name are rejected.
    pub fn with_names(
        y_true: &[usize],
        y_pred: &[usize],
        name_of: impl Fn(usize) -> String,
    ) -> Result<Self> {
        let matrix = confusion_matrix(y_true, y_pred)?;
        let total = y_true.len();
        let mut classes = IndexMap::new();
        for (idx, label) in matrix.labels.iter().enumerate() {
            let tp = matrix.counts[[idx, idx]];
            let predicted = matrix.counts.column(idx).sum();
            let support = matrix.counts.row(idx).sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let name = name_of(*label);
            let metrics = ClassMetrics {
                precision,
                recall,
                f1: harmonic(precision, recall),
                support,
            };
            if classes.insert(name.clone(), metrics).is_some() {
                return Err(AnalysisError::invalid(
                    "name_of",
                    format!("label {label} reuses the class name {name:?}"),
                ));
            }
        }

        let n_classes = classes.len() as f64;
        let macro_avg = ClassMetrics {
            precision: classes.values().map(|m| m.precision).sum::<f64>() / n_classes,
            recall: classes.values().map(|m| m.recall).sum::<f64>() / n_classes,
            f1: classes.values().map(|m| m.f1).sum::<f64>() / n_classes,
            support: total,
        };
        let weight = |pick: fn(&ClassMetrics) -> f64| {
            classes
                .values()
                .map(|m| pick(m) * m.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = ClassMetrics {
            precision: weight(|m| m.precision),
            recall: weight(|m| m.recall),
            f1: weight(|m| m.f1),
            support: total,
        };

        Ok(Self {
            accuracy: matrix.trace() as f64 / total as f64,
            classes,
            macro_avg,
            weighted_avg,
        })
    }

    /// Total number of samples scored.
    #[must_use]
    pub fn support(&self) -> usize {
        self.macro_avg.support
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .keys()
            .map(String::len)
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(0);
        let d = REPORT_DIGITS;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        let row = |f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{name:>width$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                m.precision, m.recall, m.f1, m.support
            )
        };
        for (name, metrics) in &self.classes {
            row(f, name, metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support()
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}

fn check_pair(y_true: &[usize], y_pred: &[usize], op: &'static str) -> Result<()> {
    if y_true.is_empty() {
        return Err(AnalysisError::EmptyInput(op));
    }
    AnalysisError::ensure_len(op, y_true.len(), y_pred.len())
}

fn union_labels(y_true: &[usize], y_pred: &[usize]) -> Vec<usize> {
    y_true
        .iter()
        .chain(y_pred)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn position(labels: &[usize], label: usize) -> usize {
    labels.binary_search(&label).unwrap_or_default()
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn harmonic(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const Y_TRUE: [usize; 6] = [0, 0, 1, 1, 2, 2];
    const Y_PRED: [usize; 6] = [0, 1, 1, 1, 2, 0];

    #[test]
    fn accuracy_counts_hits() {
        assert!((accuracy_score(&Y_TRUE, &Y_PRED).unwrap() - 4.0 / 6.0).abs() < 1e-12);
        assert!(matches!(
            accuracy_score(&[0, 1], &[0]),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn confusion_matrix_rows_are_truth() {
        let matrix = confusion_matrix(&Y_TRUE, &Y_PRED).unwrap();
        assert_eq!(matrix.labels, vec![0, 1, 2]);
        assert_eq!(matrix.counts, array![[1_usize, 1, 0], [0, 2, 0], [1, 0, 1]]);
        assert_eq!(matrix.trace(), 4);
        assert_eq!(matrix.to_string(), "[[1 1 0]\n [0 2 0]\n [1 0 1]]");
    }

    #[test]
    fn report_matches_hand_computation() {
        let report = ClassificationReport::new(&Y_TRUE, &Y_PRED).unwrap();
        let class1 = report.classes["1"];
        assert!((class1.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((class1.recall - 1.0).abs() < 1e-12);
        assert!((class1.f1 - 0.8).abs() < 1e-12);
        assert_eq!(class1.support, 2);
        let class2 = report.classes["2"];
        assert!((class2.precision - 1.0).abs() < 1e-12);
        assert!((class2.recall - 0.5).abs() < 1e-12);
        assert_eq!(report.support(), 6);
        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn missing_predictions_score_zero() {
        let report = ClassificationReport::new(&[0, 1], &[0, 0]).unwrap();
        assert_eq!(report.classes["1"].precision, 0.0);
        assert_eq!(report.classes["1"].f1, 0.0);
    }

    #[test]
    fn rendered_report_lists_every_row() {
        let report =
            ClassificationReport::with_names(&Y_TRUE, &Y_PRED, |l| format!("class-{l}")).unwrap();
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("class-2"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("accuracy"));
        assert_eq!(text.lines().count(), 9);
    }

    #[test]
    fn shared_class_names_are_rejected() {
        let err = ClassificationReport::with_names(&[1, 2, 2], &[1, 2, 1], |_| "same".into())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { name: "name_of", .. }));
    }
}
