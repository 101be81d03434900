//! Partitioning, cross-validation and exhaustive hyperparameter search.

/// k-fold partitioning strategies.
pub mod folds;
/// Cross-validated scoring and grid search.
pub mod search;
/// Shuffled train/test partitioning.
pub mod split;

pub use folds::{Fold, FoldStrategy, KFold, StratifiedKFold};
pub use search::{cross_val_score, CandidateScore, GridSearch, GridSearchResult};
pub use split::{take_items, take_rows, take_values, train_test_split, SplitIndices};
