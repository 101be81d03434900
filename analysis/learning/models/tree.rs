use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{argmax_first, sorted_classes, Classifier};
use crate::error::{AnalysisError, Result};

/// CART classification tree split on Gini impurity.
///
/// Features are scanned in column order and the first split reaching the lowest
/// weighted child impurity wins, so fitting is deterministic. Thresholds sit
/// halfway between consecutive distinct values; rows with `value <= threshold`
/// go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    /// Maximum depth of the tree; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Nodes with fewer rows than this become leaves.
    pub min_samples_split: usize,
    #[serde(skip)]
    fitted: Option<FittedTree>,
}

#[derive(Debug, Clone, PartialEq)]
struct FittedTree {
    root: Node,
    classes: Vec<usize>,
    n_features: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            fitted: None,
        }
    }
}

impl DecisionTreeClassifier {
    /// Unlimited-depth tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree limited to `max_depth` levels of splits.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            ..Self::default()
        }
    }

    /// Depth of the fitted tree (0 for a single leaf).
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.fitted.as_ref().map(|tree| tree.root.depth())
    }

    /// Number of leaves of the fitted tree.
    #[must_use]
    pub fn n_leaves(&self) -> Option<usize> {
        self.fitted.as_ref().map(|tree| tree.root.leaves())
    }

    fn fitted(&self) -> Result<&FittedTree> {
        self.fitted
            .as_ref()
            .ok_or(AnalysisError::NotFitted("DecisionTreeClassifier"))
    }

    fn distributions<'t>(tree: &'t FittedTree, x: &Array2<f64>) -> Result<Vec<&'t [f64]>> {
        AnalysisError::ensure_len("DecisionTreeClassifier::predict", tree.n_features, x.ncols())?;
        Ok(x.rows().into_iter().map(|row| tree.root.route(row)).collect())
    }
}

impl Node {
    fn route(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        match self {
            Self::Leaf { distribution } => distribution.as_slice(),
            Self::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.route(row)
                } else {
                    right.route(row)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 0,
            Self::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn leaves(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Split { left, right, .. } => left.leaves() + right.leaves(),
        }
    }
}

impl Builder<'_> {
    fn counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &row in rows {
            counts[self.y[row]] += 1;
        }
        counts
    }

    fn build(&self, rows: &[usize], depth: usize) -> Node {
        let counts = self.counts(rows);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || rows.len() < self.min_samples_split {
            return leaf(&counts);
        }
        let Some(best) = self.best_split(rows, &counts) else {
            return leaf(&counts);
        };
        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&row| self.x[[row, best.feature]] <= best.threshold);
        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(&left, depth + 1)),
            right: Box::new(self.build(&right, depth + 1)),
        }
    }

    fn best_split(&self, rows: &[usize], totals: &[usize]) -> Option<SplitCandidate> {
        let n = rows.len();
        let mut best: Option<SplitCandidate> = None;
        for feature in 0..self.x.ncols() {
            let mut ordered = rows.to_vec();
            ordered.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let mut left = vec![0_usize; self.n_classes];
            for split in 1..n {
                left[self.y[ordered[split - 1]]] += 1;
                let lo = self.x[[ordered[split - 1], feature]];
                let hi = self.x[[ordered[split], feature]];
                if hi <= lo {
                    continue;
                }
                let right: Vec<usize> = totals.iter().zip(&left).map(|(t, l)| t - l).collect();
                let impurity = (split as f64 * gini(&left, split)
                    + (n - split) as f64 * gini(&right, n - split))
                    / n as f64;
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = (lo + hi) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / total).powi(2))
        .sum::<f64>()
}

fn leaf(counts: &[usize]) -> Node {
    let total = counts.iter().sum::<usize>().max(1) as f64;
    Node::Leaf {
        distribution: counts.iter().map(|&c| c as f64 / total).collect(),
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        if x.nrows() == 0 {
            return Err(AnalysisError::EmptyInput("DecisionTreeClassifier::fit"));
        }
        AnalysisError::ensure_len("DecisionTreeClassifier::fit", x.nrows(), y.len())?;
        if self.min_samples_split < 2 {
            return Err(AnalysisError::invalid(
                "min_samples_split",
                format!("must be at least 2, got {}", self.min_samples_split),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(AnalysisError::invalid("max_depth", "must be at least 1"));
        }

        let classes = sorted_classes(y);
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();
        let builder = Builder {
            x,
            y: &encoded,
            n_classes: classes.len(),
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
        };
        let rows: Vec<usize> = (0..x.nrows()).collect();
        let root = builder.build(&rows, 0);
        self.fitted = Some(FittedTree {
            root,
            classes,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let tree = self.fitted()?;
        Ok(Self::distributions(tree, x)?
            .into_iter()
            .map(|distribution| tree.classes[argmax_first(distribution)])
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let tree = self.fitted()?;
        let distributions = Self::distributions(tree, x)?;
        let mut proba = Array2::zeros((x.nrows(), tree.classes.len()));
        for (mut out, distribution) in proba.rows_mut().into_iter().zip(distributions) {
            for (slot, value) in out.iter_mut().zip(distribution) {
                *slot = *value;
            }
        }
        Ok(proba)
    }

    fn classes(&self) -> &[usize] {
        self.fitted
            .as_ref()
            .map_or(&[][..], |tree| tree.classes.as_slice())
    }
}
