//! Batch z-scoring of the feature matrix.
//!
//! Column statistics are computed once over every retained row and then
//! applied; the fitted [`Standardizer`] is reported alongside results so
//! standardized values can be mapped back to feature units.

use serde::{Deserialize, Serialize};
use tt_common::{Error, Result};
use tt_math::{mean, population_std, Matrix};

/// Columns whose population standard deviation is below this are degenerate.
pub const MIN_STD: f64 = 1e-12;

/// Per-column location and scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    /// Population standard deviations (divisor N).
    pub stds: Vec<f64>,
}

impl Standardizer {
    /// Compute column means and population standard deviations.
    ///
    /// A zero-variance column is a configuration error naming the feature:
    /// standardizing it is undefined.
    pub fn fit(matrix: &Matrix, feature_names: &[String]) -> Result<Self> {
        let (n, d) = matrix.shape();
        if feature_names.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                got: feature_names.len(),
            });
        }
        if n == 0 {
            return Err(Error::EmptyInput(
                "cannot standardize an empty feature matrix".to_string(),
            ));
        }

        let mut means = Vec::with_capacity(d);
        let mut stds = Vec::with_capacity(d);
        for (c, name) in feature_names.iter().enumerate() {
            let column = matrix.column(c);
            let m = mean(&column);
            let s = population_std(&column);
            if !(s.is_finite() && s > MIN_STD) || !m.is_finite() {
                return Err(Error::DegenerateFeature {
                    feature: name.clone(),
                    rows: n,
                });
            }
            means.push(m);
            stds.push(s);
        }

        Ok(Standardizer {
            feature_names: feature_names.to_vec(),
            means,
            stds,
        })
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// Apply the fitted statistics to a matrix with the same columns.
    pub fn transform(&self, matrix: &Matrix) -> Result<Matrix> {
        let (n, d) = matrix.shape();
        if d != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                got: d,
            });
        }
        let mut out = Matrix::zeros(n, d);
        for r in 0..n {
            let src = matrix.row(r);
            for (c, z) in out.row_mut(r).iter_mut().enumerate() {
                *z = (src[c] - self.means[c]) / self.stds[c];
            }
        }
        Ok(out)
    }

    /// Fit on `matrix` and transform it.
    pub fn fit_transform(matrix: &Matrix, feature_names: &[String]) -> Result<(Self, Matrix)> {
        let standardizer = Self::fit(matrix, feature_names)?;
        let z = standardizer.transform(matrix)?;
        Ok((standardizer, z))
    }

    /// Map a standardized row back to feature units.
    pub fn inverse_row(&self, z: &[f64]) -> Vec<f64> {
        z.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| v * s + m)
            .collect()
    }
}
