//! Parameters of a k-component Gaussian mixture.

use serde::{Deserialize, Serialize};
use tt_common::{CovarianceStructure, Shape};
use tt_math::Matrix;

/// Weights, means, and covariances of one mixture.
///
/// Covariances are stored as full D×D matrices for every class. Spherical
/// and diagonal structures keep zero off-diagonals; equal-variance
/// structures repeat the same matrix in every class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureParams {
    pub structure: CovarianceStructure,
    /// Mixing proportions, length k, summing to 1.
    pub weights: Vec<f64>,
    /// Class means, k vectors of length D.
    pub means: Vec<Vec<f64>>,
    /// Class covariances, k matrices of size D×D.
    pub covariances: Vec<Matrix>,
}

impl MixtureParams {
    /// Uniform weights and `scale · I` covariances around the given means.
    pub fn with_means(structure: CovarianceStructure, means: Vec<Vec<f64>>, scale: f64) -> Self {
        let k = means.len();
        let d = means.first().map(|m| m.len()).unwrap_or(0);
        MixtureParams {
            structure,
            weights: vec![1.0 / k as f64; k],
            means,
            covariances: vec![Matrix::scaled_identity(d, scale); k],
        }
    }

    /// Number of classes.
    pub fn k(&self) -> usize {
        self.weights.len()
    }

    /// Feature dimension.
    pub fn dim(&self) -> usize {
        self.means.first().map(|m| m.len()).unwrap_or(0)
    }

    /// Per-feature variances of class `j`.
    pub fn variances(&self, j: usize) -> Vec<f64> {
        self.covariances[j].diagonal()
    }

    /// Structure-shaped view of class `j`'s covariance for reporting:
    /// one value (spherical), D values (diagonal), or the full matrix rows.
    pub fn covariance_summary(&self, j: usize) -> serde_json::Value {
        let cov = &self.covariances[j];
        match self.structure.shape() {
            Shape::Spherical => serde_json::json!(cov.get(0, 0)),
            Shape::Diagonal => serde_json::json!(cov.diagonal()),
            Shape::Full => serde_json::json!(cov.to_rows()),
        }
    }

    /// Whether every parameter is finite.
    pub fn is_finite(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite())
            && self.means.iter().flatten().all(|m| m.is_finite())
            && self.covariances.iter().all(|c| c.is_finite())
    }
}
