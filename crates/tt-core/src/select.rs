//! Candidate sweeps and information-criterion comparison.
//!
//! The selector fits every `(k, structure)` candidate and tabulates
//! comparable statistics. It never picks a model: choosing one is left to
//! the caller, who can re-sort the table or ask for the lowest value of a
//! criterion.

use clap::ValueEnum;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tt_common::{CovarianceStructure, Error, Result};
use tt_math::{shannon_entropy, Matrix};

use crate::classify::argmax_label;
use crate::mixture::estimator::build_pool;
use crate::mixture::{EstimatorOptions, FittedModel, MixtureModelEstimator};

/// Criteria a comparison table can be ordered by. Lower is better for all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Aic,
    Bic,
    Sabic,
    Caic,
    Icl,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Criterion::Aic => "aic",
            Criterion::Bic => "bic",
            Criterion::Sabic => "sabic",
            Criterion::Caic => "caic",
            Criterion::Icl => "icl",
        };
        write!(f, "{}", s)
    }
}

/// One fitting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub k: usize,
    pub structure: CovarianceStructure,
}

/// Every candidate in `classes × structures`, class count outermost.
pub fn candidate_grid(
    classes: std::ops::RangeInclusive<usize>,
    structures: &[CovarianceStructure],
) -> Vec<Candidate> {
    classes
        .flat_map(|k| structures.iter().map(move |&structure| Candidate { k, structure }))
        .collect()
}

/// Likelihood-based criteria for one fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationCriteria {
    pub aic: f64,
    pub bic: f64,
    /// BIC with sample size `(N + 2) / 24`.
    pub sabic: f64,
    pub caic: f64,
    /// BIC plus twice the classification entropy.
    pub icl: f64,
}

/// AIC, BIC, SABIC, CAIC and ICL.
///
/// `classification_entropy` is `Σ_i Σ_j −z_ij ln z_ij` in nats.
pub fn information_criteria(
    log_likelihood: f64,
    n_parameters: usize,
    n_observations: usize,
    classification_entropy: f64,
) -> InformationCriteria {
    let p = n_parameters as f64;
    let n = n_observations as f64;
    let deviance = -2.0 * log_likelihood;
    let bic = deviance + p * n.ln();
    InformationCriteria {
        aic: deviance + 2.0 * p,
        bic,
        sabic: deviance + p * ((n + 2.0) / 24.0).ln(),
        caic: deviance + p * (n.ln() + 1.0),
        icl: bic + 2.0 * classification_entropy,
    }
}

/// Total Shannon entropy of the responsibility rows, in nats.
pub fn classification_entropy(responsibilities: &Matrix) -> f64 {
    responsibilities.iter_rows().map(shannon_entropy).sum()
}

/// `1 − Σ entropy / (N ln k)`, clamped to `[0, 1]`.
///
/// One-hot rows give 1 and uniform rows give 0. A single class has no
/// classification uncertainty and scores 1.
pub fn entropy_quality(responsibilities: &Matrix) -> f64 {
    let (n, k) = responsibilities.shape();
    if k < 2 || n == 0 {
        return 1.0;
    }
    let max = n as f64 * (k as f64).ln();
    (1.0 - classification_entropy(responsibilities) / max).clamp(0.0, 1.0)
}

/// Diagnostics of the hard assignment implied by a responsibility matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDiagnostics {
    /// Smallest per-class mean posterior of assigned units.
    pub prob_min: f64,
    /// Largest per-class mean posterior of assigned units.
    pub prob_max: f64,
    /// Smallest assigned class proportion.
    pub n_min: f64,
}

/// Per-class average posterior and size of the argmax assignment.
///
/// A class with no assigned units contributes 0 to both.
pub fn classification_diagnostics(responsibilities: &Matrix) -> ClassificationDiagnostics {
    let (n, k) = responsibilities.shape();
    let mut counts = vec![0usize; k];
    let mut sums = vec![0.0; k];
    for row in responsibilities.iter_rows() {
        let j = argmax_label(row) - 1;
        counts[j] += 1;
        sums[j] += row[j];
    }
    let probs: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
        .collect();
    let prob_min = probs.iter().cloned().fold(f64::INFINITY, f64::min);
    let prob_max = probs.iter().cloned().fold(0.0, f64::max);
    let n_min = counts.iter().min().copied().unwrap_or(0) as f64 / n.max(1) as f64;
    ClassificationDiagnostics {
        prob_min: if prob_min.is_finite() { prob_min } else { 0.0 },
        prob_max,
        n_min,
    }
}

/// Comparison statistics for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub k: usize,
    pub structure: CovarianceStructure,
    pub log_likelihood: f64,
    pub n_parameters: usize,
    pub aic: f64,
    pub bic: f64,
    pub sabic: f64,
    pub caic: f64,
    pub icl: f64,
    /// Entropy-based classification quality in `[0, 1]`.
    pub entropy: f64,
    pub prob_min: f64,
    pub prob_max: f64,
    pub n_min: f64,
    pub converged: bool,
    pub degenerate: bool,
    pub regularized: bool,
    pub monotonicity_violation: bool,
    pub iterations: usize,
}

impl ComparisonRow {
    pub fn from_model(model: &FittedModel) -> Self {
        let resp = &model.responsibilities;
        let ic = information_criteria(
            model.log_likelihood,
            model.n_parameters,
            model.n_observations,
            classification_entropy(resp),
        );
        let diag = classification_diagnostics(resp);
        ComparisonRow {
            k: model.k,
            structure: model.structure,
            log_likelihood: model.log_likelihood,
            n_parameters: model.n_parameters,
            aic: ic.aic,
            bic: ic.bic,
            sabic: ic.sabic,
            caic: ic.caic,
            icl: ic.icl,
            entropy: entropy_quality(resp),
            prob_min: diag.prob_min,
            prob_max: diag.prob_max,
            n_min: diag.n_min,
            converged: model.converged,
            degenerate: model.degenerate,
            regularized: model.regularized,
            monotonicity_violation: model.monotonicity_violation,
            iterations: model.iterations,
        }
    }

    pub fn criterion(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Aic => self.aic,
            Criterion::Bic => self.bic,
            Criterion::Sabic => self.sabic,
            Criterion::Caic => self.caic,
            Criterion::Icl => self.icl,
        }
    }

    pub fn candidate(&self) -> Candidate {
        Candidate {
            k: self.k,
            structure: self.structure,
        }
    }
}

/// Rows of a sweep, ordered by ascending BIC unless re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub n_observations: usize,
    pub sorted_by: Criterion,
    pub rows: Vec<ComparisonRow>,
}

/// NaN sorts after every number.
fn criterion_key(v: f64) -> f64 {
    if v.is_nan() {
        f64::INFINITY
    } else {
        v
    }
}

impl ComparisonTable {
    /// Build from rows in candidate order and sort by BIC.
    pub fn new(n_observations: usize, rows: Vec<ComparisonRow>) -> Self {
        ComparisonTable {
            n_observations,
            sorted_by: Criterion::Bic,
            rows,
        }
        .sorted_by(Criterion::Bic)
    }

    /// Stable re-sort by ascending `criterion`.
    pub fn sorted_by(mut self, criterion: Criterion) -> Self {
        self.rows.sort_by(|a, b| {
            criterion_key(a.criterion(criterion)).total_cmp(&criterion_key(b.criterion(criterion)))
        });
        self.sorted_by = criterion;
        self
    }

    /// Row with the lowest `criterion`, optionally among converged fits only.
    pub fn lowest(&self, criterion: Criterion, converged_only: bool) -> Option<&ComparisonRow> {
        self.rows
            .iter()
            .filter(|r| !converged_only || r.converged)
            .filter(|r| !r.criterion(criterion).is_nan())
            .min_by(|a, b| a.criterion(criterion).total_cmp(&b.criterion(criterion)))
    }

    pub fn get(&self, k: usize, structure: CovarianceStructure) -> Option<&ComparisonRow> {
        self.rows
            .iter()
            .find(|r| r.k == k && r.structure == structure)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fits candidate sets and tabulates them.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    estimator: MixtureModelEstimator,
}

impl ModelSelector {
    pub fn new(options: EstimatorOptions) -> Self {
        ModelSelector {
            estimator: MixtureModelEstimator::new(options),
        }
    }

    fn validate(&self, data: &Matrix, candidates: &[Candidate]) -> Result<()> {
        if candidates.is_empty() {
            return Err(Error::invalid("candidates", "at least one candidate is required"));
        }
        let n = data.rows();
        if let Some(c) = candidates.iter().find(|c| c.k < 1 || c.k > n) {
            return Err(Error::invalid(
                "classes",
                format!("class count {} is outside 1..={} for {} retained units", c.k, n, n),
            ));
        }
        Ok(())
    }

    /// Fit every candidate; results are in candidate order.
    ///
    /// Candidates and their restarts share one worker pool. Collection
    /// waits for every fit, so order and values do not depend on
    /// scheduling.
    pub fn fit_grid(&self, data: &Matrix, candidates: &[Candidate]) -> Result<Vec<FittedModel>> {
        self.validate(data, candidates)?;
        let pool = build_pool(self.estimator.options().threads)?;
        pool.install(|| {
            candidates
                .par_iter()
                .map(|c| self.estimator.fit_in_current_pool(data, c.k, c.structure))
                .collect::<Result<Vec<_>>>()
        })
    }

    /// Fit every candidate and return the comparison table.
    pub fn compare(&self, data: &Matrix, candidates: &[Candidate]) -> Result<ComparisonTable> {
        let models = self.fit_grid(data, candidates)?;
        let rows: Vec<ComparisonRow> = models.iter().map(ComparisonRow::from_model).collect();
        Ok(ComparisonTable::new(data.rows(), rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn row(k: usize, bic: f64, aic: f64, converged: bool) -> ComparisonRow {
        ComparisonRow {
            k,
            structure: CovarianceStructure::Eei,
            log_likelihood: -10.0,
            n_parameters: 3,
            aic,
            bic,
            sabic: bic,
            caic: bic,
            icl: bic,
            entropy: 1.0,
            prob_min: 1.0,
            prob_max: 1.0,
            n_min: 0.5,
            converged,
            degenerate: false,
            regularized: false,
            monotonicity_violation: false,
            iterations: 4,
        }
    }

    #[test]
    fn grid_order_is_k_then_structure() {
        let grid = candidate_grid(1..=2, &[CovarianceStructure::Eei, CovarianceStructure::Vvv]);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[1], Candidate { k: 1, structure: CovarianceStructure::Vvv });
        assert_eq!(grid[2].k, 2);
    }

    #[test]
    fn criteria_formulas() {
        let ic = information_criteria(-100.0, 7, 50, 3.0);
        assert!(approx_eq(ic.aic, 214.0, 1e-12));
        assert!(approx_eq(ic.bic, 200.0 + 7.0 * 50f64.ln(), 1e-12));
        assert!(approx_eq(ic.sabic, 200.0 + 7.0 * (52.0f64 / 24.0).ln(), 1e-12));
        assert!(approx_eq(ic.caic, 200.0 + 7.0 * (50f64.ln() + 1.0), 1e-12));
        assert!(approx_eq(ic.icl, ic.bic + 6.0, 1e-12));
    }

    #[test]
    fn entropy_quality_bounds() {
        let one_hot = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(entropy_quality(&one_hot), 1.0);
        let uniform = Matrix::from_rows(&[vec![0.5, 0.5], vec![0.5, 0.5]]).unwrap();
        assert!(approx_eq(entropy_quality(&uniform), 0.0, 1e-12));
        let single = Matrix::from_rows(&[vec![1.0], vec![1.0]]).unwrap();
        assert_eq!(entropy_quality(&single), 1.0);
        let mixed = Matrix::from_rows(&[vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap();
        let q = entropy_quality(&mixed);
        assert!(q > 0.0 && q < 1.0);
    }

    #[test]
    fn diagnostics_handle_empty_classes() {
        let resp = Matrix::from_rows(&[
            vec![0.9, 0.1, 0.0],
            vec![0.7, 0.3, 0.0],
            vec![0.2, 0.8, 0.0],
        ])
        .unwrap();
        let d = classification_diagnostics(&resp);
        assert_eq!(d.prob_min, 0.0);
        assert!(approx_eq(d.prob_max, 0.8, 1e-12));
        assert_eq!(d.n_min, 0.0);
    }

    #[test]
    fn table_sorts_by_bic_and_resorts() {
        let table = ComparisonTable::new(
            10,
            vec![row(1, 30.0, 5.0, true), row(2, 10.0, 20.0, true), row(3, 20.0, 1.0, false)],
        );
        let ks: Vec<usize> = table.rows.iter().map(|r| r.k).collect();
        assert_eq!(ks, vec![2, 3, 1]);
        assert_eq!(table.sorted_by, Criterion::Bic);

        let by_aic = table.clone().sorted_by(Criterion::Aic);
        let ks: Vec<usize> = by_aic.rows.iter().map(|r| r.k).collect();
        assert_eq!(ks, vec![3, 1, 2]);
    }

    #[test]
    fn lowest_respects_convergence_filter() {
        let table = ComparisonTable::new(
            10,
            vec![row(1, 30.0, 5.0, true), row(2, 10.0, 20.0, true), row(3, 20.0, 1.0, false)],
        );
        assert_eq!(table.lowest(Criterion::Aic, false).map(|r| r.k), Some(3));
        assert_eq!(table.lowest(Criterion::Aic, true).map(|r| r.k), Some(1));
        assert!(table.get(2, CovarianceStructure::Eei).is_some());
        assert!(table.get(2, CovarianceStructure::Vvv).is_none());
    }

    #[test]
    fn nan_rows_sort_last() {
        let table = ComparisonTable::new(
            10,
            vec![row(1, f64::NAN, 0.0, true), row(2, 50.0, 0.0, true)],
        );
        assert_eq!(table.rows[0].k, 2);
        assert_eq!(table.lowest(Criterion::Bic, false).map(|r| r.k), Some(2));
    }

    #[test]
    fn selector_rejects_too_many_classes() {
        let data = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        let selector = ModelSelector::new(EstimatorOptions::default());
        let err = selector
            .compare(&data, &candidate_grid(1..=4, &[CovarianceStructure::Eii]))
            .unwrap_err();
        assert!(err.to_string().contains("class count 4"));
        assert!(selector.compare(&data, &[]).is_err());
    }
}
