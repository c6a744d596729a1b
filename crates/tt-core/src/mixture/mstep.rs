//! M-step: maximise the expected complete-data log-likelihood under a
//! covariance structure, with a lower bound on every variance.
//!
//! The floor is applied as a constraint, not a ridge: spherical and
//! diagonal variances are clamped, full covariances have their eigenvalues
//! clamped. Each is the exact constrained maximiser, so EM stays monotone
//! with the floor active.

use tt_common::{Shape, Sharing};
use tt_math::{clamp_eigenvalues, Matrix};

use super::params::MixtureParams;

/// Classes with less total responsibility than this keep their previous
/// mean and covariance.
pub const MIN_CLASS_MASS: f64 = 1e-8;

/// Result of one M-step.
#[derive(Debug, Clone)]
pub struct MStep {
    pub params: MixtureParams,
    /// Some variance or eigenvalue was raised to the floor.
    pub regularized: bool,
    /// Classes that kept their previous parameters.
    pub empty_classes: usize,
}

fn floor_variance(v: f64, floor: f64, regularized: &mut bool) -> f64 {
    if v >= floor {
        v
    } else {
        *regularized = true;
        floor
    }
}

/// Responsibility-weighted scatter of class `j` about `mean`.
///
/// For non-full shapes only the diagonal is accumulated.
fn class_scatter(data: &Matrix, resp: &Matrix, j: usize, mean: &[f64], full: bool) -> Matrix {
    let d = data.cols();
    let mut scatter = Matrix::zeros(d, d);
    let mut diff = vec![0.0; d];
    for (i, x) in data.iter_rows().enumerate() {
        let r = resp.get(i, j);
        if r == 0.0 {
            continue;
        }
        for (t, (a, m)) in diff.iter_mut().zip(x.iter().zip(mean)) {
            *t = a - m;
        }
        if full {
            scatter.add_scaled_outer(r, &diff);
        } else {
            for (c, v) in diff.iter().enumerate() {
                let cur = scatter.get(c, c);
                scatter.set(c, c, cur + r * v * v);
            }
        }
    }
    scatter
}

/// Structure-constrained parameter update.
pub fn m_step(data: &Matrix, resp: &Matrix, prev: &MixtureParams, floor: f64) -> MStep {
    let n = data.rows();
    let d = data.cols();
    let k = prev.k();
    let structure = prev.structure;
    let shape = structure.shape();
    let full = shape == Shape::Full;

    let mass: Vec<f64> = (0..k)
        .map(|j| (0..n).map(|i| resp.get(i, j)).sum())
        .collect();
    let total: f64 = mass.iter().sum();
    let empty: Vec<bool> = mass.iter().map(|m| *m < MIN_CLASS_MASS).collect();

    let weights: Vec<f64> = mass.iter().map(|m| m / total).collect();

    let means: Vec<Vec<f64>> = (0..k)
        .map(|j| {
            if empty[j] {
                return prev.means[j].clone();
            }
            let mut mu = vec![0.0; d];
            for (i, x) in data.iter_rows().enumerate() {
                let r = resp.get(i, j);
                for (m, v) in mu.iter_mut().zip(x) {
                    *m += r * v;
                }
            }
            mu.iter_mut().for_each(|m| *m /= mass[j]);
            mu
        })
        .collect();

    let scatters: Vec<Matrix> = (0..k)
        .map(|j| class_scatter(data, resp, j, &means[j], full))
        .collect();

    let mut regularized = false;
    let covariances: Vec<Matrix> = match structure.sharing() {
        Sharing::Varying => (0..k)
            .map(|j| {
                if empty[j] {
                    return prev.covariances[j].clone();
                }
                let mut cov = scatters[j].clone();
                cov.scale(1.0 / mass[j]);
                constrain(cov, shape, floor, &mut regularized)
            })
            .collect(),
        Sharing::Equal => {
            let mut pooled = Matrix::zeros(d, d);
            for s in &scatters {
                pooled.add_scaled(1.0, s);
            }
            pooled.scale(1.0 / total);
            let shared = constrain(pooled, shape, floor, &mut regularized);
            vec![shared; k]
        }
    };

    MStep {
        params: MixtureParams {
            structure,
            weights,
            means,
            covariances,
        },
        regularized,
        empty_classes: empty.iter().filter(|e| **e).count(),
    }
}

/// Project a raw covariance estimate onto the structure's shape and floor.
fn constrain(cov: Matrix, shape: Shape, floor: f64, regularized: &mut bool) -> Matrix {
    let d = cov.rows();
    match shape {
        Shape::Spherical => {
            let v = cov.trace() / d as f64;
            Matrix::scaled_identity(d, floor_variance(v, floor, regularized))
        }
        Shape::Diagonal => {
            let diag: Vec<f64> = cov
                .diagonal()
                .into_iter()
                .map(|v| floor_variance(v, floor, regularized))
                .collect();
            Matrix::from_diagonal(&diag)
        }
        Shape::Full => {
            let (out, clamped) = clamp_eigenvalues(&cov, floor);
            *regularized |= clamped;
            out
        }
    }
}
