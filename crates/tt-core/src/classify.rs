//! Hard class assignment and class profiles from a fitted model.

use serde::{Deserialize, Serialize};
use tt_common::{CovarianceStructure, Error, Result, UnitId};
use tt_math::Matrix;

use crate::features::FeatureMatrix;
use crate::logging::{event_names, Stage};
use crate::mixture::FittedModel;

/// 1-based index of the largest entry; ties go to the lowest index.
///
/// NaN never wins. An empty row yields 1.
pub fn argmax_label(row: &[f64]) -> usize {
    let mut best = 0;
    for (j, v) in row.iter().enumerate().skip(1) {
        if *v > row[best] || (row[best].is_nan() && !v.is_nan()) {
            best = j;
        }
    }
    best + 1
}

/// Label and posteriors of one retained unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedUnit {
    pub id: UnitId,
    pub name: String,
    /// Class label in `1..=k`.
    pub label: usize,
    /// Full responsibility row, length k.
    pub posteriors: Vec<f64>,
}

impl ClassifiedUnit {
    pub fn max_posterior(&self) -> f64 {
        self.posteriors.get(self.label - 1).copied().unwrap_or(0.0)
    }
}

/// Description of one latent class in feature terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProfile {
    pub label: usize,
    /// Units assigned to the class.
    pub size: usize,
    pub proportion: f64,
    /// Mean posterior of the assigned units; 0 when the class is empty.
    pub mean_posterior: f64,
    /// Average standardized features of assigned units.
    pub mean_standardized: Vec<f64>,
    /// Average raw ratios of assigned units.
    pub mean_raw: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub k: usize,
    pub structure: CovarianceStructure,
    pub n_units: usize,
    /// Threshold used for `low_confidence`.
    pub low_confidence_threshold: f64,
    /// Units whose largest posterior is below the threshold.
    pub low_confidence: usize,
    /// Units per label, index 0 is label 1.
    pub class_sizes: Vec<usize>,
}

/// Classification of every retained unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub units: Vec<ClassifiedUnit>,
    pub profiles: Vec<ClassProfile>,
    pub summary: ClassificationSummary,
}

/// Turns a fitted model into per-unit labels.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationAssigner {
    low_confidence: f64,
}

impl Default for ClassificationAssigner {
    fn default() -> Self {
        ClassificationAssigner { low_confidence: 0.8 }
    }
}

impl ClassificationAssigner {
    pub fn new(low_confidence: f64) -> Self {
        ClassificationAssigner { low_confidence }
    }

    /// Assign labels to the units the model was fitted on.
    ///
    /// `features` and `standardized` must be the row-aligned inputs of
    /// the fit. Low-confidence units are counted, never relabelled.
    pub fn assign(
        &self,
        model: &FittedModel,
        features: &FeatureMatrix,
        standardized: &Matrix,
    ) -> Result<ClassificationResult> {
        let resp = &model.responsibilities;
        let n = resp.rows();
        if features.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                got: features.len(),
            });
        }
        if standardized.rows() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                got: standardized.rows(),
            });
        }

        let units: Vec<ClassifiedUnit> = resp
            .iter_rows()
            .enumerate()
            .map(|(i, row)| ClassifiedUnit {
                id: features.ids[i].clone(),
                name: features.names[i].clone(),
                label: argmax_label(row),
                posteriors: row.to_vec(),
            })
            .collect();

        let profiles = class_profiles(model.k, &units, standardized, &features.raw);
        let low_confidence = units
            .iter()
            .filter(|u| u.max_posterior() < self.low_confidence)
            .count();

        let summary = ClassificationSummary {
            k: model.k,
            structure: model.structure,
            n_units: n,
            low_confidence_threshold: self.low_confidence,
            low_confidence,
            class_sizes: profiles.iter().map(|p| p.size).collect(),
        };

        tracing::debug!(
            event = event_names::CLASSIFY_FINISHED,
            stage = %Stage::Classify,
            k = model.k,
            units = n,
            low_confidence,
            "units classified"
        );

        Ok(ClassificationResult {
            units,
            profiles,
            summary,
        })
    }
}

fn column_means(rows: &[usize], matrix: &Matrix) -> Vec<f64> {
    let d = matrix.cols();
    let mut out = vec![0.0; d];
    if rows.is_empty() {
        return out;
    }
    for &i in rows {
        for (o, v) in out.iter_mut().zip(matrix.row(i)) {
            *o += v;
        }
    }
    out.iter_mut().for_each(|o| *o /= rows.len() as f64);
    out
}

/// One profile per label, in label order.
pub fn class_profiles(
    k: usize,
    units: &[ClassifiedUnit],
    standardized: &Matrix,
    raw: &Matrix,
) -> Vec<ClassProfile> {
    let n = units.len();
    (1..=k)
        .map(|label| {
            let members: Vec<usize> = units
                .iter()
                .enumerate()
                .filter(|(_, u)| u.label == label)
                .map(|(i, _)| i)
                .collect();
            let size = members.len();
            let mean_posterior = if size == 0 {
                0.0
            } else {
                members
                    .iter()
                    .map(|&i| units[i].posteriors[label - 1])
                    .sum::<f64>()
                    / size as f64
            };
            ClassProfile {
                label,
                size,
                proportion: if n == 0 { 0.0 } else { size as f64 / n as f64 },
                mean_posterior,
                mean_standardized: column_means(&members, standardized),
                mean_raw: column_means(&members, raw),
            }
        })
        .collect()
}
