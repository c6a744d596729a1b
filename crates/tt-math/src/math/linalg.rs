//! Dense matrices for data and covariance handling.
//!
//! `Matrix` is the row-major container the estimator works on: N×D data
//! with cheap row slices, and D×D covariances that serialize into reports.
//! Factorisations go through `nalgebra`:
//! - `Cholesky`: log-determinant and Mahalanobis distance
//! - `symmetric_eigen`: eigen decomposition of a symmetric matrix
//! - `clamp_eigenvalues`: projection onto `{Σ : λ_min(Σ) >= floor}`

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// `scale * I`.
    pub fn scaled_identity(n: usize, scale: f64) -> Self {
        Self::from_diagonal(&vec![scale; n])
    }

    /// Diagonal matrix from a vector.
    pub fn from_diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        let mut m = Self::zeros(n, n);
        for (i, &d) in diag.iter().enumerate() {
            m.data[i * n + i] = d;
        }
        m
    }

    /// Build from a flat row-major buffer. Returns None on a size mismatch.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// Build from row vectors. Returns None for ragged input.
    ///
    /// An empty slice produces a 0×0 matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Some(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    /// Borrow row `r`.
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Mutably borrow row `r`.
    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        let cols = self.cols;
        &mut self.data[r * cols..(r + 1) * cols]
    }

    /// Iterate over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        let cols = self.cols;
        (0..self.rows).map(move |r| &self.data[r * cols..(r + 1) * cols])
    }

    /// Copy out column `c`.
    pub fn column(&self, c: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, c)).collect()
    }

    /// Main diagonal.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.rows.min(self.cols)).map(|i| self.get(i, i)).collect()
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> f64 {
        self.diagonal().iter().sum()
    }

    /// Flat row-major view.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Row vectors, cloned.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(|r| r.to_vec()).collect()
    }

    /// Multiply every entry by `s`.
    pub fn scale(&mut self, s: f64) {
        for v in &mut self.data {
            *v *= s;
        }
    }

    /// `self += weight * v vᵀ` (square matrices only).
    pub fn add_scaled_outer(&mut self, weight: f64, v: &[f64]) {
        debug_assert_eq!(self.rows, v.len());
        debug_assert_eq!(self.cols, v.len());
        let n = self.cols;
        for i in 0..n {
            let wi = weight * v[i];
            for j in 0..n {
                self.data[i * n + j] += wi * v[j];
            }
        }
    }

    /// `self += weight * other` (same shape).
    pub fn add_scaled(&mut self, weight: f64, other: &Matrix) {
        debug_assert_eq!(self.shape(), other.shape());
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += weight * b;
        }
    }

    /// True when every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Copy into an `nalgebra` matrix.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.rows, self.cols, &self.data)
    }

    /// Copy out of an `nalgebra` matrix (column-major) into row-major order.
    pub fn from_dmatrix(m: &DMatrix<f64>) -> Self {
        let (rows, cols) = m.shape();
        let data = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| m[(r, c)]))
            .collect();
        Self { rows, cols, data }
    }

    /// Largest absolute entry-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &Matrix) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

/// Cholesky factor `L` of a symmetric positive-definite `A = L Lᵀ`.
#[derive(Debug, Clone)]
pub struct Cholesky {
    l: DMatrix<f64>,
}

impl Cholesky {
    /// Factor a symmetric positive-definite matrix.
    ///
    /// Returns None if the matrix is not square, not finite, or not
    /// positive definite. Only the lower triangle is read.
    pub fn factor(a: &Matrix) -> Option<Self> {
        if a.rows() != a.cols() || !a.is_finite() {
            return None;
        }
        let chol = nalgebra::Cholesky::new(a.to_dmatrix())?;
        Some(Self { l: chol.l() })
    }

    /// ln det(A) = 2 Σ ln L_ii.
    pub fn log_det(&self) -> f64 {
        2.0 * self.l.diagonal().iter().map(|d| d.ln()).sum::<f64>()
    }

    /// Squared Mahalanobis norm `diffᵀ A⁻¹ diff = |L⁻¹ diff|²`.
    pub fn mahalanobis(&self, diff: &[f64]) -> f64 {
        debug_assert_eq!(diff.len(), self.l.nrows());
        self.l
            .solve_lower_triangular(&DVector::from_column_slice(diff))
            .map_or(f64::INFINITY, |y| y.norm_squared())
    }
}

/// Eigen decomposition of a symmetric matrix: `A = V diag(values) Vᵀ`.
///
/// Eigenvectors are the columns of `vectors`; no ordering is implied.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub values: Vec<f64>,
    pub vectors: Matrix,
}

impl SymmetricEigen {
    /// Rebuild `V diag(values) Vᵀ`.
    pub fn reconstruct(&self) -> Matrix {
        let v = self.vectors.to_dmatrix();
        let lambda = DMatrix::from_diagonal(&DVector::from_column_slice(&self.values));
        Matrix::from_dmatrix(&(&v * lambda * v.transpose()))
    }
}

/// `(A + Aᵀ) / 2`
fn symmetric_part(a: &Matrix) -> DMatrix<f64> {
    let m = a.to_dmatrix();
    (&m + m.transpose()) * 0.5
}

/// Eigen decomposition of the symmetric part of `a`.
pub fn symmetric_eigen(a: &Matrix) -> SymmetricEigen {
    let eig = nalgebra::SymmetricEigen::new(symmetric_part(a));
    SymmetricEigen {
        values: eig.eigenvalues.iter().copied().collect(),
        vectors: Matrix::from_dmatrix(&eig.eigenvectors),
    }
}

/// Clamp the eigenvalues of a symmetric matrix at `floor`.
///
/// This is the maximiser of the Gaussian likelihood over covariances with
/// minimum eigenvalue `floor`, given the unconstrained scatter estimate.
/// Returns the clamped matrix and whether any eigenvalue was raised.
pub fn clamp_eigenvalues(a: &Matrix, floor: f64) -> (Matrix, bool) {
    let sym = symmetric_part(a);
    let mut eig = nalgebra::SymmetricEigen::new(sym.clone());
    let mut clamped = false;
    for lambda in eig.eigenvalues.iter_mut() {
        if *lambda < floor || !lambda.is_finite() {
            *lambda = floor;
            clamped = true;
        }
    }
    if !clamped {
        return (Matrix::from_dmatrix(&sym), false);
    }
    let out = eig.recompose();
    (Matrix::from_dmatrix(&((&out + out.transpose()) * 0.5)), true)
}
