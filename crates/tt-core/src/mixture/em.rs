//! One EM run from one starting point.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tt_common::CovarianceStructure;
use tt_config::{FitOptions, InitStrategy};
use tt_math::Matrix;

use super::estep::e_step;
use super::init::initialize;
use super::mstep::m_step;
use super::params::MixtureParams;
use crate::logging::{event_names, Stage};

/// Per-run EM settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmOptions {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub variance_floor: f64,
    pub init: InitStrategy,
    pub init_scale: f64,
}

impl Default for EmOptions {
    fn default() -> Self {
        EmOptions {
            tolerance: 1e-6,
            max_iterations: 1000,
            variance_floor: 1e-6,
            init: InitStrategy::KMeansPlusPlus,
            init_scale: 1.0,
        }
    }
}

impl From<&FitOptions> for EmOptions {
    fn from(fit: &FitOptions) -> Self {
        EmOptions {
            tolerance: fit.tolerance,
            max_iterations: fit.max_iterations,
            variance_floor: fit.variance_floor,
            init: fit.init,
            init_scale: fit.init_scale,
        }
    }
}

/// Outcome of one EM run.
#[derive(Debug, Clone)]
pub struct EmRun {
    pub params: MixtureParams,
    /// Responsibilities under `params`.
    pub responsibilities: Matrix,
    pub log_likelihood: f64,
    /// Completed M-step/E-step pairs.
    pub iterations: usize,
    pub converged: bool,
    /// An E-step row underflowed, a class emptied, or the likelihood left
    /// the finite range.
    pub degenerate: bool,
    /// The variance floor was active in some M-step.
    pub regularized: bool,
    /// The log-likelihood decreased by more than rounding noise.
    pub monotonicity_violation: bool,
    /// Log-likelihood after the initial E-step and after every iteration.
    pub trace: Vec<f64>,
}

/// Initialise from `rng` and iterate to convergence.
pub fn run_em<R: Rng + ?Sized>(
    data: &Matrix,
    k: usize,
    structure: CovarianceStructure,
    opts: &EmOptions,
    rng: &mut R,
) -> EmRun {
    let init = initialize(data, k, structure, opts.init, opts.init_scale, rng);
    run_em_from(data, init, opts)
}

/// Iterate EM from the given parameters.
///
/// Stops when the log-likelihood gain drops below `tolerance`, after
/// `max_iterations`, or when the likelihood stops being finite.
pub fn run_em_from(data: &Matrix, init: MixtureParams, opts: &EmOptions) -> EmRun {
    let mut params = init;
    let mut e = e_step(data, &params);
    let mut degenerate = e.degenerate_rows > 0;
    let mut regularized = false;
    let mut monotonicity_violation = false;
    let mut converged = false;
    let mut iterations = 0;
    let mut trace = vec![e.log_likelihood];

    while iterations < opts.max_iterations && e.log_likelihood.is_finite() {
        let m = m_step(data, &e.responsibilities, &params, opts.variance_floor);
        regularized |= m.regularized;
        degenerate |= m.empty_classes > 0;

        let next = e_step(data, &m.params);
        iterations += 1;
        degenerate |= next.degenerate_rows > 0;

        let previous = e.log_likelihood;
        let delta = next.log_likelihood - previous;
        if delta < -1e-8 * (1.0 + previous.abs()) {
            monotonicity_violation = true;
            tracing::warn!(
                event = event_names::FIT_MONOTONICITY_VIOLATION,
                stage = %Stage::Fit,
                k = params.k(),
                structure = %params.structure,
                iteration = iterations,
                previous,
                current = next.log_likelihood,
                "log-likelihood decreased"
            );
        }

        params = m.params;
        e = next;
        trace.push(e.log_likelihood);

        if !e.log_likelihood.is_finite() {
            degenerate = true;
            break;
        }
        if delta < opts.tolerance {
            converged = true;
            break;
        }
    }

    if !e.log_likelihood.is_finite() {
        degenerate = true;
    }

    EmRun {
        params,
        responsibilities: e.responsibilities,
        log_likelihood: e.log_likelihood,
        iterations,
        converged,
        degenerate,
        regularized,
        monotonicity_violation,
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn square_pairs() -> Matrix {
        let mut rows = Vec::new();
        for c in [-5.0, 5.0] {
            for (dx, dy) in [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)] {
                rows.push(vec![c + dx, c + dy]);
            }
        }
        Matrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn recovers_two_squares() {
        let opts = EmOptions {
            tolerance: 1e-10,
            ..EmOptions::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let run = run_em(&square_pairs(), 2, CovarianceStructure::Eei, &opts, &mut rng);
        assert!(run.converged);
        assert!(!run.degenerate);
        let expected = 8.0 * (0.5f64.ln() - tt_math::LOG_2PI - 1.0);
        assert!(approx_eq(run.log_likelihood, expected, 1e-6));
        assert_eq!(run.trace.len(), run.iterations + 1);
    }

    #[test]
    fn trace_is_non_decreasing() {
        let data = square_pairs();
        for s in CovarianceStructure::ALL {
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let run = run_em(&data, 2, s, &EmOptions::default(), &mut rng);
            for w in run.trace.windows(2) {
                assert!(w[1] >= w[0] - 1e-8 * (1.0 + w[0].abs()), "{s}: {w:?}");
            }
            assert!(!run.monotonicity_violation);
        }
    }

    #[test]
    fn max_iterations_bounds_the_run() {
        let opts = EmOptions {
            tolerance: 0.0,
            max_iterations: 3,
            ..EmOptions::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let run = run_em(&square_pairs(), 2, CovarianceStructure::Vvi, &opts, &mut rng);
        assert_eq!(run.iterations, 3);
        assert!(!run.converged);
    }

    #[test]
    fn single_class_is_closed_form() {
        let data = square_pairs();
        let init = MixtureParams::with_means(CovarianceStructure::Vvi, vec![vec![0.0, 0.0]], 1.0);
        let run = run_em_from(&data, init, &EmOptions::default());
        assert!(run.converged);
        assert_eq!(run.params.means[0], vec![0.0, 0.0]);
        // var = 26 in each coordinate
        assert!(approx_eq(run.params.variances(0)[0], 26.0, 1e-12));
    }

    #[test]
    fn duplicate_points_hit_the_floor() {
        let data = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![4.0, 4.0],
            vec![4.0, 4.0],
            vec![4.0, 4.0],
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let run = run_em(&data, 2, CovarianceStructure::Vvv, &EmOptions::default(), &mut rng);
        assert!(run.regularized);
        assert!(run.params.is_finite());
        assert!(run.log_likelihood.is_finite());
    }
}
