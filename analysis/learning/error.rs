use thiserror::Error;

/// Errors raised by the analysis library.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// An operation received no samples.
    #[error("{0}: input is empty")]
    EmptyInput(&'static str),
    /// Two inputs that must line up do not.
    #[error("{context}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Operation that detected the mismatch.
        context: &'static str,
        /// Expected length or column count.
        expected: usize,
        /// Observed length or column count.
        found: usize,
    },
    /// A hyperparameter or argument is out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human readable constraint.
        reason: String,
    },
    /// An estimator was asked to predict before `fit`.
    #[error("{0} used before fit")]
    NotFitted(&'static str),
    /// The least-squares system has no unique solution.
    #[error("singular matrix while solving normal equations")]
    SingularMatrix,
    /// Embedded dataset text could not be parsed.
    #[error("dataset line {line}: {reason}")]
    Dataset {
        /// One-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },
    /// Rendering a figure failed.
    #[error("plot error: {0}")]
    Plot(String),
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn ensure_len(
        context: &'static str,
        expected: usize,
        found: usize,
    ) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                context,
                expected,
                found,
            })
        }
    }
}

/// Result alias used across the library.
pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
