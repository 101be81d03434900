//! Feature transforms fitted on a training partition and replayed on others.
//!
//! Each transform has an unfitted configuration type whose `fit` returns a
//! distinct fitted type, so a transform can only be applied with parameters
//! learned from data.

/// Polynomial expansion.
pub mod poly;
/// Zero-mean, unit-variance standardization.
pub mod scaler;

pub use poly::{FittedPolynomial, PolynomialFeatures};
pub use scaler::{FittedScaler, StandardScaler};
