use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

const IRIS_CSV: &str = include_str!("../data/iris.csv");
const IRIS_TARGET_NAMES: [&str; 3] = ["setosa", "versicolor", "virginica"];

/// Numeric feature matrix paired with one integer class label per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSet {
    /// Row-major features, one sample per row.
    pub features: Array2<f64>,
    /// Class label of each row.
    pub targets: Vec<usize>,
    /// Column names.
    pub feature_names: Vec<String>,
    /// Display name of each class label, keyed by label.
    pub target_names: BTreeMap<usize, String>,
}

impl ClassificationSet {
    /// Builds a set after checking that rows and labels line up.
    pub fn new(features: Array2<f64>, targets: Vec<usize>) -> Result<Self> {
        AnalysisError::ensure_len("classification set", features.nrows(), targets.len())?;
        let feature_names = (0..features.ncols())
            .map(|idx| format!("feature_{idx}"))
            .collect();
        let target_names = distinct_labels(&targets)
            .into_iter()
            .map(|label| (label, label.to_string()))
            .collect();
        Ok(Self {
            features,
            targets,
            feature_names,
            target_names,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Sorted distinct labels present in the targets.
    #[must_use]
    pub fn classes(&self) -> Vec<usize> {
        distinct_labels(&self.targets)
    }

    /// Count of distinct labels.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes().len()
    }

    /// Display name for a label, falling back to the number itself.
    #[must_use]
    pub fn target_name(&self, label: usize) -> String {
        self.target_names
            .get(&label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}

/// Loads the 150-row, 4-feature, 3-class iris set compiled into the crate.
pub fn load_iris() -> Result<ClassificationSet> {
    let mut set = parse_classification_csv(IRIS_CSV)?;
    set.target_names = IRIS_TARGET_NAMES
        .iter()
        .enumerate()
        .map(|(label, name)| (label, (*name).to_string()))
        .collect();
    Ok(set)
}

/// Parses CSV text whose header names the columns and whose last column is an
/// integer class label.
pub fn parse_classification_csv(text: &str) -> Result<ClassificationSet> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());
    let (_, header) = lines.next().ok_or(AnalysisError::EmptyInput("csv header"))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    if columns.len() < 2 {
        return Err(AnalysisError::Dataset {
            line: 1,
            reason: "need at least one feature column and a label column".into(),
        });
    }
    let n_features = columns.len() - 1;

    let mut values = Vec::new();
    let mut targets = Vec::new();
    for (idx, line) in lines {
        let line_no = idx + 1;
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != columns.len() {
            return Err(AnalysisError::Dataset {
                line: line_no,
                reason: format!("expected {} fields, found {}", columns.len(), fields.len()),
            });
        }
        for field in &fields[..n_features] {
            let value = field.parse::<f64>().map_err(|err| AnalysisError::Dataset {
                line: line_no,
                reason: format!("`{field}`: {err}"),
            })?;
            values.push(value);
        }
        let label = fields[n_features]
            .parse::<usize>()
            .map_err(|err| AnalysisError::Dataset {
                line: line_no,
                reason: format!("label `{}`: {err}", fields[n_features]),
            })?;
        targets.push(label);
    }
    if targets.is_empty() {
        return Err(AnalysisError::EmptyInput("csv rows"));
    }

    let features = Array2::from_shape_vec((targets.len(), n_features), values).map_err(|err| {
        AnalysisError::Dataset {
            line: 0,
            reason: err.to_string(),
        }
    })?;
    let mut set = ClassificationSet::new(features, targets)?;
    set.feature_names = columns[..n_features]
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(set)
}

fn distinct_labels(targets: &[usize]) -> Vec<usize> {
    targets
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn iris_has_expected_shape() {
        let iris = load_iris().unwrap();
        assert_eq!(iris.n_samples(), 150);
        assert_eq!(iris.n_features(), 4);
        assert_eq!(iris.classes(), vec![0, 1, 2]);
        assert_eq!(iris.feature_names[2], "petal_length");
        assert_eq!(iris.target_name(1), "versicolor");
        for class in 0..3 {
            assert_eq!(iris.targets.iter().filter(|&&t| t == class).count(), 50);
        }
        assert!((iris.features[[0, 0]] - 5.1).abs() < 1e-12);
        assert!((iris.features[[149, 3]] - 1.8).abs() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_rows() {
        let err = ClassificationSet::new(array![[1.0], [2.0]], vec![0]).unwrap_err();
        assert!(matches!(err, AnalysisError::ShapeMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn reports_bad_fields_with_line_numbers() {
        let err = parse_classification_csv("a,b,label\n1.0,2.0,0\n1.0,x,1\n").unwrap_err();
        assert!(matches!(err, AnalysisError::Dataset { line: 3, .. }));
    }

    #[test]
    fn binary_sets_report_two_classes() {
        let set = parse_classification_csv("x,label\n0.1,1\n0.4,0\n0.9,1\n").unwrap();
        assert_eq!(set.n_classes(), 2);
        assert_eq!(set.target_name(7), "7");
    }

    #[test]
    fn sparse_labels_keep_their_own_names() {
        let set = ClassificationSet::new(array![[0.0], [1.0], [2.0], [3.0]], vec![1, 2, 2, 5]).unwrap();
        assert_eq!(set.target_name(1), "1");
        assert_eq!(set.target_name(2), "2");
        assert_eq!(set.target_name(5), "5");
        assert_eq!(set.target_names.len(), 3);
    }
}
