//! E-step: posterior class responsibilities in the log domain.

use tt_common::Shape;
use tt_math::{
    diagonal_log_density, full_log_density, normalize_log_weights, safe_ln,
    spherical_log_density, Cholesky, Matrix,
};

use super::params::MixtureParams;

/// Result of one E-step.
#[derive(Debug, Clone)]
pub struct EStep {
    /// N×k posterior probabilities, rows summing to 1.
    pub responsibilities: Matrix,
    /// Total log-likelihood of the data under the parameters.
    ///
    /// NEG_INFINITY when any row has no finite class density.
    pub log_likelihood: f64,
    /// Rows whose densities all underflowed and fell back to uniform.
    pub degenerate_rows: usize,
}

/// A class density prepared once per E-step.
enum ComponentDensity {
    Spherical(f64),
    Diagonal(Vec<f64>),
    Full(Cholesky),
    /// Covariance could not be factored; density is zero everywhere.
    Singular,
}

impl ComponentDensity {
    fn new(shape: Shape, cov: &Matrix) -> Self {
        match shape {
            Shape::Spherical => ComponentDensity::Spherical(cov.get(0, 0)),
            Shape::Diagonal => ComponentDensity::Diagonal(cov.diagonal()),
            Shape::Full => match Cholesky::factor(cov) {
                Some(chol) => ComponentDensity::Full(chol),
                None => ComponentDensity::Singular,
            },
        }
    }

    fn log_density(&self, x: &[f64], mean: &[f64]) -> f64 {
        let value = match self {
            ComponentDensity::Spherical(v) => spherical_log_density(x, mean, *v),
            ComponentDensity::Diagonal(v) => diagonal_log_density(x, mean, v),
            ComponentDensity::Full(chol) => full_log_density(x, mean, chol),
            ComponentDensity::Singular => f64::NEG_INFINITY,
        };
        if value.is_nan() {
            f64::NEG_INFINITY
        } else {
            value
        }
    }
}

/// Compute responsibilities and the log-likelihood.
///
/// Each row is normalised with log-sum-exp. A row whose weighted class
/// log-densities are all `-inf` gets uniform responsibilities and is
/// counted in [`EStep::degenerate_rows`].
pub fn e_step(data: &Matrix, params: &MixtureParams) -> EStep {
    let n = data.rows();
    let k = params.k();
    let shape = params.structure.shape();

    let densities: Vec<ComponentDensity> = params
        .covariances
        .iter()
        .map(|c| ComponentDensity::new(shape, c))
        .collect();
    let log_weights: Vec<f64> = params.weights.iter().map(|w| safe_ln(*w)).collect();

    let mut responsibilities = Matrix::zeros(n, k);
    let mut log_likelihood = 0.0;
    let mut degenerate_rows = 0;

    for (i, x) in data.iter_rows().enumerate() {
        let row = responsibilities.row_mut(i);
        for j in 0..k {
            row[j] = log_weights[j] + densities[j].log_density(x, &params.means[j]);
        }
        let lse = normalize_log_weights(row);
        if lse.is_finite() {
            log_likelihood += lse;
        } else {
            row.fill(1.0 / k as f64);
            degenerate_rows += 1;
            log_likelihood = f64::NEG_INFINITY;
        }
    }

    EStep {
        responsibilities,
        log_likelihood,
        degenerate_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_common::CovarianceStructure;
    use tt_math::LOG_2PI;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn two_class(structure: CovarianceStructure) -> MixtureParams {
        MixtureParams::with_means(structure, vec![vec![-2.0, 0.0], vec![2.0, 0.0]], 1.0)
    }

    #[test]
    fn rows_sum_to_one() {
        let data = Matrix::from_rows(&[
            vec![-2.0, 0.1],
            vec![0.0, 0.0],
            vec![1.7, -0.4],
            vec![25.0, 3.0],
        ])
        .unwrap();
        for s in CovarianceStructure::ALL {
            let e = e_step(&data, &two_class(s));
            for row in e.responsibilities.iter_rows() {
                assert!(approx_eq(row.iter().sum::<f64>(), 1.0, 1e-12));
            }
            assert_eq!(e.degenerate_rows, 0);
        }
    }

    #[test]
    fn midpoint_is_split_evenly() {
        let data = Matrix::from_rows(&[vec![0.0, 0.0]]).unwrap();
        let e = e_step(&data, &two_class(CovarianceStructure::Eei));
        assert!(approx_eq(e.responsibilities.get(0, 0), 0.5, 1e-12));
    }

    #[test]
    fn far_points_do_not_underflow() {
        // Densities are ~exp(-5e5); only the log domain keeps them apart.
        let data = Matrix::from_rows(&[vec![1000.0, 0.0]]).unwrap();
        let e = e_step(&data, &two_class(CovarianceStructure::Vvi));
        assert_eq!(e.degenerate_rows, 0);
        assert!(e.log_likelihood.is_finite());
        assert!(approx_eq(e.responsibilities.get(0, 1), 1.0, 1e-12));
    }

    #[test]
    fn single_component_log_likelihood() {
        let data = Matrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
        let p = MixtureParams::with_means(CovarianceStructure::Eii, vec![vec![0.0, 0.0]], 1.0);
        let expected = 2.0 * (-LOG_2PI) - 0.5 * 2.0;
        assert!(approx_eq(e_step(&data, &p).log_likelihood, expected, 1e-12));
    }

    #[test]
    fn all_zero_weights_fall_back_to_uniform() {
        let data = Matrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let mut p = two_class(CovarianceStructure::Eei);
        p.weights = vec![0.0, 0.0];
        let e = e_step(&data, &p);
        assert_eq!(e.degenerate_rows, 2);
        assert_eq!(e.log_likelihood, f64::NEG_INFINITY);
        assert_eq!(e.responsibilities.row(0), &[0.5, 0.5]);
    }

    #[test]
    fn singular_full_covariance_is_zero_density() {
        let data = Matrix::from_rows(&[vec![2.0, 0.0]]).unwrap();
        let mut p = two_class(CovarianceStructure::Vvv);
        p.covariances[0] = Matrix::zeros(2, 2);
        let e = e_step(&data, &p);
        assert_eq!(e.degenerate_rows, 0);
        assert_eq!(e.responsibilities.get(0, 0), 0.0);
        assert!(approx_eq(e.responsibilities.get(0, 1), 1.0, 1e-15));
    }
}
