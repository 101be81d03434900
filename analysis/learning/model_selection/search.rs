use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{
    folds::FoldStrategy,
    split::{take_items, take_rows},
};
use crate::{
    error::{AnalysisError, Result},
    metrics::accuracy_score,
    models::Classifier,
};

/// Accuracy of a fresh copy of `estimator` on each validation fold.
pub fn cross_val_score<C, F>(estimator: &C, x: &Array2<f64>, y: &[usize], folds: &F) -> Result<Vec<f64>>
where
    C: Classifier + Clone,
    F: FoldStrategy + ?Sized,
{
    AnalysisError::ensure_len("cross_val_score", x.nrows(), y.len())?;
    folds
        .split(y)?
        .iter()
        .map(|fold| {
            let mut model = estimator.clone();
            model.fit(&take_rows(x, &fold.train), &take_items(y, &fold.train))?;
            let predicted = model.predict(&take_rows(x, &fold.validation))?;
            accuracy_score(&take_items(y, &fold.validation), &predicted)
        })
        .collect()
}

/// Cross-validated score of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore<P> {
    /// Hyperparameter value.
    pub candidate: P,
    /// Accuracy on each fold.
    pub fold_scores: Vec<f64>,
    /// Mean of `fold_scores`.
    pub mean_score: f64,
}

/// Outcome of a grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult<P> {
    /// Winning candidate.
    pub best: P,
    /// Position of the winner in the candidate list.
    pub best_index: usize,
    /// Mean fold score of the winner.
    pub best_score: f64,
    /// Every candidate's scores, in candidate order.
    pub results: Vec<CandidateScore<P>>,
}

/// Exhaustive search over an explicit list of hyperparameter values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSearch<P> {
    candidates: Vec<P>,
}

impl<P: Clone> GridSearch<P> {
    /// Search over `candidates`, which must not be empty.
    pub fn new(candidates: Vec<P>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(AnalysisError::invalid("candidates", "grid is empty"));
        }
        Ok(Self { candidates })
    }

    /// Candidate values in evaluation order.
    #[must_use]
    pub fn candidates(&self) -> &[P] {
        &self.candidates
    }

    /// Scores every candidate built by `build` with cross-validation and picks
    /// the highest mean; the earliest candidate wins ties.
    pub fn fit<C, B, F>(
        &self,
        build: B,
        x: &Array2<f64>,
        y: &[usize],
        folds: &F,
    ) -> Result<GridSearchResult<P>>
    where
        B: Fn(&P) -> C,
        C: Classifier + Clone,
        F: FoldStrategy + ?Sized,
    {
        let mut results: Vec<CandidateScore<P>> = Vec::with_capacity(self.candidates.len());
        let mut best_index = 0;
        for (idx, candidate) in self.candidates.iter().enumerate() {
            let fold_scores = cross_val_score(&build(candidate), x, y, folds)?;
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            if idx > 0 && mean_score > results[best_index].mean_score {
                best_index = idx;
            }
            results.push(CandidateScore {
                candidate: candidate.clone(),
                fold_scores,
                mean_score,
            });
        }
        Ok(GridSearchResult {
            best: self.candidates[best_index].clone(),
            best_index,
            best_score: results[best_index].mean_score,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model_selection::{KFold, StratifiedKFold},
        models::KNeighborsClassifier,
    };
    use ndarray::Array2;

    fn blobs() -> (Array2<f64>, Vec<usize>) {
        let mut values = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let offset = if i % 2 == 0 { 0.0 } else { 8.0 };
            values.push(offset + (i as f64) * 0.05);
            values.push(offset - (i as f64) * 0.03);
            labels.push(i % 2);
        }
        (Array2::from_shape_vec((20, 2), values).unwrap(), labels)
    }

    #[test]
    fn separable_data_scores_perfectly() {
        let (x, y) = blobs();
        let scores =
            cross_val_score(&KNeighborsClassifier::new(3), &x, &y, &StratifiedKFold { n_splits: 5 })
                .unwrap();
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|&s| (s - 1.0).abs() < 1e-12));
    }

    #[test]
    fn ties_keep_first_candidate() {
        let (x, y) = blobs();
        let search = GridSearch::new(vec![3, 5, 7, 9]).unwrap();
        let result = search
            .fit(|&k| KNeighborsClassifier::new(k), &x, &y, &KFold { n_splits: 4 })
            .unwrap();
        assert_eq!(result.best, 3);
        assert_eq!(result.best_index, 0);
        assert_eq!(result.results.len(), 4);
        assert!(search.candidates().contains(&result.best));
    }

    #[test]
    fn errors_from_any_candidate_abort_the_search() {
        let (x, y) = blobs();
        let search = GridSearch::new(vec![3, 50]).unwrap();
        let err = search
            .fit(|&k| KNeighborsClassifier::new(k), &x, &y, &KFold { n_splits: 4 })
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { name: "n_neighbors", .. }));
    }

    #[test]
    fn empty_grid_is_rejected() {
        assert!(GridSearch::<usize>::new(Vec::new()).is_err());
    }
}
