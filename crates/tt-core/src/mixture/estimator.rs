//! Seeded multi-restart fitting of one candidate `(k, structure)`.
//!
//! Every restart draws from its own `ChaCha8Rng` stream whose seed is a
//! pure function of `(seed, k, structure, restart)`. The result therefore
//! does not depend on the worker count or on whether the candidate is
//! fitted alone or inside a sweep.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tt_common::{CovarianceStructure, Error, Result};
use tt_config::FitOptions;
use tt_math::Matrix;

use super::em::{run_em, EmOptions, EmRun};
use super::params::MixtureParams;
use crate::logging::{event_names, Stage};

/// Restart and threading settings around [`EmOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorOptions {
    pub restarts: usize,
    pub seed: u64,
    /// Worker threads; 0 uses the rayon default.
    pub threads: usize,
    pub em: EmOptions,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        EstimatorOptions {
            restarts: 10,
            seed: 36,
            threads: 0,
            em: EmOptions::default(),
        }
    }
}

impl From<&FitOptions> for EstimatorOptions {
    fn from(fit: &FitOptions) -> Self {
        EstimatorOptions {
            restarts: fit.restarts,
            seed: fit.seed,
            threads: fit.threads,
            em: EmOptions::from(fit),
        }
    }
}

/// The best restart of one candidate, with everything needed downstream.
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    pub k: usize,
    pub structure: CovarianceStructure,
    pub params: MixtureParams,
    /// N×k posterior class probabilities.
    #[serde(skip)]
    pub responsibilities: Matrix,
    pub log_likelihood: f64,
    pub n_parameters: usize,
    pub n_observations: usize,
    pub converged: bool,
    pub degenerate: bool,
    pub regularized: bool,
    pub monotonicity_violation: bool,
    pub iterations: usize,
    /// Index of the kept restart.
    pub best_restart: usize,
    /// Final log-likelihood of every restart, in restart order.
    pub restart_log_likelihoods: Vec<f64>,
    /// Per-iteration log-likelihood of the kept restart.
    pub trace: Vec<f64>,
}

impl FittedModel {
    pub fn dim(&self) -> usize {
        self.params.dim()
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of the RNG stream for one restart of one candidate.
pub fn restart_seed(seed: u64, k: usize, structure: CovarianceStructure, restart: usize) -> u64 {
    let mut state = seed;
    let mut out = splitmix64(&mut state);
    for part in [k as u64, structure.ordinal(), restart as u64] {
        state ^= part.wrapping_add(out);
        out = splitmix64(&mut state);
    }
    out
}

/// Build a bounded worker pool; `threads == 0` lets rayon choose.
pub fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Estimation(format!("failed to build worker pool: {}", e)))
}

/// Fits Gaussian mixtures by EM with random restarts.
#[derive(Debug, Clone)]
pub struct MixtureModelEstimator {
    options: EstimatorOptions,
}

impl MixtureModelEstimator {
    pub fn new(options: EstimatorOptions) -> Self {
        MixtureModelEstimator { options }
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    fn validate(&self, data: &Matrix, k: usize) -> Result<()> {
        let n = data.rows();
        if n == 0 || data.cols() == 0 {
            return Err(Error::EmptyInput("feature matrix has no rows or columns".to_string()));
        }
        if k < 1 {
            return Err(Error::invalid("classes", "must be at least 1"));
        }
        if k > n {
            return Err(Error::invalid(
                "classes",
                format!("{} classes requested but only {} units retained", k, n),
            ));
        }
        if self.options.restarts < 1 {
            return Err(Error::invalid("fit.restarts", "must be at least 1"));
        }
        if !data.is_finite() {
            return Err(Error::InvalidInput("feature matrix contains non-finite values".to_string()));
        }
        Ok(())
    }

    /// Fit one candidate on a pool sized by `threads`.
    pub fn fit(&self, data: &Matrix, k: usize, structure: CovarianceStructure) -> Result<FittedModel> {
        self.validate(data, k)?;
        let pool = build_pool(self.options.threads)?;
        pool.install(|| self.fit_in_current_pool(data, k, structure))
    }

    /// Fit one candidate on whatever rayon pool the caller is running in.
    pub fn fit_in_current_pool(
        &self,
        data: &Matrix,
        k: usize,
        structure: CovarianceStructure,
    ) -> Result<FittedModel> {
        self.validate(data, k)?;
        let opts = self.options.em;
        let seed = self.options.seed;

        let runs: Vec<EmRun> = (0..self.options.restarts)
            .into_par_iter()
            .map(|restart| {
                let mut rng = ChaCha8Rng::seed_from_u64(restart_seed(seed, k, structure, restart));
                let run = run_em(data, k, structure, &opts, &mut rng);
                tracing::debug!(
                    event = event_names::FIT_RESTART_DONE,
                    stage = %Stage::Fit,
                    k,
                    structure = %structure,
                    restart,
                    log_likelihood = run.log_likelihood,
                    iterations = run.iterations,
                    converged = run.converged,
                    "restart finished"
                );
                run
            })
            .collect();

        let restart_log_likelihoods: Vec<f64> = runs.iter().map(|r| r.log_likelihood).collect();
        let best_restart = best_index(&restart_log_likelihoods)
            .ok_or_else(|| Error::Estimation("no restarts were run".to_string()))?;
        let best = runs
            .into_iter()
            .nth(best_restart)
            .ok_or_else(|| Error::Estimation("best restart missing".to_string()))?;

        let model = FittedModel {
            k,
            structure,
            params: best.params,
            responsibilities: best.responsibilities,
            log_likelihood: best.log_likelihood,
            n_parameters: structure.parameter_count(k, data.cols()),
            n_observations: data.rows(),
            converged: best.converged,
            degenerate: best.degenerate,
            regularized: best.regularized,
            monotonicity_violation: best.monotonicity_violation,
            iterations: best.iterations,
            best_restart,
            restart_log_likelihoods,
            trace: best.trace,
        };

        tracing::debug!(
            event = event_names::FIT_CANDIDATE_DONE,
            stage = %Stage::Fit,
            k,
            structure = %structure,
            log_likelihood = model.log_likelihood,
            best_restart,
            converged = model.converged,
            degenerate = model.degenerate,
            "candidate fitted"
        );
        Ok(model)
    }
}

/// Index of the largest value; NaN ranks lowest and ties go to the first.
fn best_index(values: &[f64]) -> Option<usize> {
    let key = |v: f64| if v.is_nan() { f64::NEG_INFINITY } else { v };
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            Some(b) if key(*v).total_cmp(&key(values[b])).is_le() => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Matrix {
        let mut rows = Vec::new();
        for (i, c) in [-4.0, 4.0].iter().enumerate() {
            for t in 0..10 {
                let off = (t as f64 - 4.5) * 0.2;
                rows.push(vec![c + off, c - off * (i as f64 + 1.0) * 0.5]);
            }
        }
        Matrix::from_rows(&rows).unwrap()
    }

    fn options(restarts: usize, threads: usize) -> EstimatorOptions {
        EstimatorOptions {
            restarts,
            threads,
            ..EstimatorOptions::default()
        }
    }

    #[test]
    fn restart_seeds_differ_by_every_input() {
        let base = restart_seed(36, 2, CovarianceStructure::Vvi, 0);
        assert_ne!(base, restart_seed(37, 2, CovarianceStructure::Vvi, 0));
        assert_ne!(base, restart_seed(36, 3, CovarianceStructure::Vvi, 0));
        assert_ne!(base, restart_seed(36, 2, CovarianceStructure::Eei, 0));
        assert_ne!(base, restart_seed(36, 2, CovarianceStructure::Vvi, 1));
        assert_eq!(base, restart_seed(36, 2, CovarianceStructure::Vvi, 0));
    }

    #[test]
    fn best_index_prefers_first_of_ties_and_skips_nan() {
        assert_eq!(best_index(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(best_index(&[f64::NAN, -5.0]), Some(1));
        assert_eq!(best_index(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), Some(0));
        assert_eq!(best_index(&[]), None);
    }

    #[test]
    fn keeps_the_best_restart() {
        let model = MixtureModelEstimator::new(options(6, 2))
            .fit(&blobs(), 2, CovarianceStructure::Vvi)
            .unwrap();
        assert_eq!(model.restart_log_likelihoods.len(), 6);
        let max = model
            .restart_log_likelihoods
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(model.log_likelihood, max);
        assert_eq!(model.restart_log_likelihoods[model.best_restart], max);
        assert_eq!(model.n_parameters, 1 + 4 + 4);
        assert_eq!(model.n_observations, 20);
    }

    #[test]
    fn thread_count_does_not_change_the_fit() {
        let data = blobs();
        let one = MixtureModelEstimator::new(options(5, 1))
            .fit(&data, 3, CovarianceStructure::Eee)
            .unwrap();
        let four = MixtureModelEstimator::new(options(5, 4))
            .fit(&data, 3, CovarianceStructure::Eee)
            .unwrap();
        assert_eq!(one.params, four.params);
        assert_eq!(one.restart_log_likelihoods, four.restart_log_likelihoods);
        assert_eq!(one.best_restart, four.best_restart);
    }

    #[test]
    fn rejects_more_classes_than_rows() {
        let data = Matrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();
        let err = MixtureModelEstimator::new(options(2, 1))
            .fit(&data, 3, CovarianceStructure::Eii)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "classes"));
    }

    #[test]
    fn rejects_zero_classes_and_empty_data() {
        let est = MixtureModelEstimator::new(options(2, 1));
        assert!(est.fit(&blobs(), 0, CovarianceStructure::Eii).is_err());
        assert!(matches!(
            est.fit(&Matrix::zeros(0, 2), 1, CovarianceStructure::Eii),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn k_equals_one_has_no_randomness() {
        let model = MixtureModelEstimator::new(options(3, 1))
            .fit(&blobs(), 1, CovarianceStructure::Vvv)
            .unwrap();
        assert!(model.converged);
        assert!(model
            .restart_log_likelihoods
            .windows(2)
            .all(|w| (w[0] - w[1]).abs() < 1e-9));
        assert_eq!(model.best_restart, 0);
    }
}
