use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// One train/validation partition of a cross-validation round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    /// Rows used for fitting, ascending.
    pub train: Vec<usize>,
    /// Rows used for scoring, ascending.
    pub validation: Vec<usize>,
}

/// Produces the folds of a cross-validation run over labelled rows.
pub trait FoldStrategy {
    /// Splits `0..labels.len()` into folds.
    fn split(&self, labels: &[usize]) -> Result<Vec<Fold>>;
}

/// Contiguous, unshuffled folds; the first `n % k` folds hold one extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFold {
    /// Number of folds.
    pub n_splits: usize,
}

/// Folds preserving class proportions.
///
/// Rows are grouped by label (ascending) and dealt round-robin to the folds in
/// their original order, continuing the deal across classes so fold sizes
/// differ by at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratifiedKFold {
    /// Number of folds.
    pub n_splits: usize,
}

impl FoldStrategy for KFold {
    fn split(&self, labels: &[usize]) -> Result<Vec<Fold>> {
        let n = labels.len();
        check_splits(self.n_splits, n)?;
        let base = n / self.n_splits;
        let extra = n % self.n_splits;
        let mut assignment = Vec::with_capacity(n);
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            assignment.extend(std::iter::repeat(fold).take(size));
        }
        Ok(folds_from_assignment(&assignment, self.n_splits))
    }
}

impl FoldStrategy for StratifiedKFold {
    fn split(&self, labels: &[usize]) -> Result<Vec<Fold>> {
        let n = labels.len();
        check_splits(self.n_splits, n)?;
        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (row, &label) in labels.iter().enumerate() {
            by_class.entry(label).or_default().push(row);
        }
        let mut assignment = vec![0; n];
        let mut dealt = 0;
        for rows in by_class.values() {
            for &row in rows {
                assignment[row] = dealt % self.n_splits;
                dealt += 1;
            }
        }
        Ok(folds_from_assignment(&assignment, self.n_splits))
    }
}

fn check_splits(n_splits: usize, n: usize) -> Result<()> {
    if n_splits < 2 || n_splits > n {
        return Err(AnalysisError::invalid(
            "n_splits",
            format!("must lie in 2..={n} for {n} rows, got {n_splits}"),
        ));
    }
    Ok(())
}

fn folds_from_assignment(assignment: &[usize], n_splits: usize) -> Vec<Fold> {
    (0..n_splits)
        .map(|fold| {
            let (validation, train): (Vec<usize>, Vec<usize>) =
                (0..assignment.len()).partition(|&row| assignment[row] == fold);
            Fold { train, validation }
        })
        .collect()
}
