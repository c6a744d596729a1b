//! Multivariate Gaussian log-densities.
//!
//! Three covariance shapes are supported, matching the parameterisations the
//! mixture estimator uses:
//! - spherical: `σ² I`
//! - diagonal: `diag(σ²_1..σ²_D)`
//! - full: any SPD matrix, passed pre-factored as a `Cholesky`

use super::linalg::Cholesky;
use super::stable::LOG_2PI;

/// Log-density of `N(mean, variance * I)` at `x`.
///
/// Returns NAN for a non-positive variance.
pub fn spherical_log_density(x: &[f64], mean: &[f64], variance: f64) -> f64 {
    debug_assert_eq!(x.len(), mean.len());
    if variance.is_nan() || variance <= 0.0 {
        return f64::NAN;
    }
    let d = x.len() as f64;
    let sq: f64 = x.iter().zip(mean).map(|(a, m)| (a - m) * (a - m)).sum();
    -0.5 * (d * (LOG_2PI + variance.ln()) + sq / variance)
}

/// Log-density of `N(mean, diag(variances))` at `x`.
///
/// Returns NAN if any variance is non-positive.
pub fn diagonal_log_density(x: &[f64], mean: &[f64], variances: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), mean.len());
    debug_assert_eq!(x.len(), variances.len());
    let mut acc = 0.0;
    for ((a, m), v) in x.iter().zip(mean).zip(variances) {
        if v.is_nan() || *v <= 0.0 {
            return f64::NAN;
        }
        let diff = a - m;
        acc += LOG_2PI + v.ln() + diff * diff / v;
    }
    -0.5 * acc
}

/// Log-density of `N(mean, Σ)` at `x`, with `Σ = L Lᵀ` supplied as `chol`.
pub fn full_log_density(x: &[f64], mean: &[f64], chol: &Cholesky) -> f64 {
    debug_assert_eq!(x.len(), mean.len());
    let diff: Vec<f64> = x.iter().zip(mean).map(|(a, m)| a - m).collect();
    let d = x.len() as f64;
    -0.5 * (d * LOG_2PI + chol.log_det() + chol.mahalanobis(&diff))
}
