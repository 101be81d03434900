use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// False/true positive rates at every distinct score threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    /// False positive rate, non-decreasing, starting at 0.
    pub fpr: Vec<f64>,
    /// True positive rate, non-decreasing, starting at 0.
    pub tpr: Vec<f64>,
    /// Decision thresholds in decreasing order; the first is `+inf`.
    pub thresholds: Vec<f64>,
}

/// Computes the ROC curve of `scores` against binary `y_true`, treating
/// `pos_label` as the positive class and every other label as negative.
///
/// Every distinct score becomes a threshold; collinear points are kept.
pub fn roc_curve(y_true: &[usize], scores: &[f64], pos_label: usize) -> Result<RocCurve> {
    if y_true.is_empty() {
        return Err(AnalysisError::EmptyInput("roc_curve"));
    }
    AnalysisError::ensure_len("roc_curve", y_true.len(), scores.len())?;
    let positives = y_true.iter().filter(|&&label| label == pos_label).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(AnalysisError::invalid(
            "y_true",
            "roc_curve needs both positive and negative samples",
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = RocCurve {
        fpr: vec![0.0],
        tpr: vec![0.0],
        thresholds: vec![f64::INFINITY],
    };
    let (mut tp, mut fp) = (0_usize, 0_usize);
    for (rank, &idx) in order.iter().enumerate() {
        if y_true[idx] == pos_label {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_score = order
            .get(rank + 1)
            .map_or(true, |&next| scores[next] != scores[idx]);
        if last_of_score {
            curve.tpr.push(tp as f64 / positives as f64);
            curve.fpr.push(fp as f64 / negatives as f64);
            curve.thresholds.push(scores[idx]);
        }
    }
    Ok(curve)
}

/// Area under a piecewise-linear curve by the trapezoidal rule.
///
/// `x` must be monotonic; a decreasing `x` yields the same positive area.
pub fn auc(x: &[f64], y: &[f64]) -> Result<f64> {
    AnalysisError::ensure_len("auc", x.len(), y.len())?;
    if x.len() < 2 {
        return Err(AnalysisError::invalid("x", "auc needs at least two points"));
    }
    let increasing = x.windows(2).all(|w| w[1] >= w[0]);
    let decreasing = x.windows(2).all(|w| w[1] <= w[0]);
    if !increasing && !decreasing {
        return Err(AnalysisError::invalid("x", "auc requires monotonic x"));
    }
    let area: f64 = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum();
    Ok(if increasing { area } else { -area })
}
