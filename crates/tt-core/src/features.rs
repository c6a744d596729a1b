//! Feature derivation: raw counts → ratio features.
//!
//! Each configured [`FeatureDef`] turns two count fields of a [`Unit`] into a
//! ratio and applies its [`Transform`]. A unit whose ratios are not all
//! defined is excluded with a recorded reason; exclusion is filtering, not
//! an error. Row order of the resulting matrix follows input order.

use serde::{Deserialize, Serialize};
use tt_common::{Error, Result, Unit, UnitId};
use tt_config::{FeatureDef, Transform};
use tt_math::Matrix;

/// Why a unit was dropped before modelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// A count field is absent or null.
    MissingField { field: String },
    /// A denominator is zero or negative.
    NonPositiveDenominator { field: String },
    /// The ratio exceeds 1.
    NumeratorExceedsDenominator { feature: String },
    /// A count is negative.
    NegativeCount { field: String },
    /// The transformed value is NaN or infinite.
    NonFinite { feature: String },
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::MissingField { field } => write!(f, "missing field '{}'", field),
            ExclusionReason::NonPositiveDenominator { field } => {
                write!(f, "non-positive denominator '{}'", field)
            }
            ExclusionReason::NumeratorExceedsDenominator { feature } => {
                write!(f, "numerator exceeds denominator for '{}'", feature)
            }
            ExclusionReason::NegativeCount { field } => write!(f, "negative count '{}'", field),
            ExclusionReason::NonFinite { feature } => {
                write!(f, "non-finite value for '{}'", feature)
            }
        }
    }
}

/// One excluded unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub id: UnitId,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

/// Counts of retained and excluded units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformReport {
    pub total: usize,
    pub retained: usize,
    pub excluded: Vec<Exclusion>,
}

/// Retained units and their features, row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Column names, in configuration order.
    pub feature_names: Vec<String>,
    pub ids: Vec<UnitId>,
    pub names: Vec<String>,
    /// Transformed features, N×D.
    pub values: Matrix,
    /// Untransformed ratios `numerator / denominator`, N×D.
    pub raw: Matrix,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.feature_names.len()
    }
}

/// Apply a transform to a ratio.
pub fn apply_transform(transform: Transform, ratio: f64, log_floor: f64) -> f64 {
    match transform {
        Transform::Proportion => ratio,
        Transform::Complement => 1.0 - ratio,
        Transform::LogProportion => (ratio + log_floor).ln(),
        Transform::LogComplement => (1.0 - ratio + log_floor).ln(),
    }
}

fn read_count(unit: &Unit, field: &str) -> std::result::Result<f64, ExclusionReason> {
    match unit.count(field) {
        None => Err(ExclusionReason::MissingField {
            field: field.to_string(),
        }),
        Some(v) if v.is_nan() => Err(ExclusionReason::MissingField {
            field: field.to_string(),
        }),
        Some(v) if v < 0.0 => Err(ExclusionReason::NegativeCount {
            field: field.to_string(),
        }),
        Some(v) => Ok(v),
    }
}

/// Compute one feature for one unit: `(ratio, transformed)`.
pub fn derive_feature(
    unit: &Unit,
    def: &FeatureDef,
) -> std::result::Result<(f64, f64), ExclusionReason> {
    let numerator = read_count(unit, &def.numerator)?;
    let denominator = read_count(unit, &def.denominator)?;
    if denominator <= 0.0 {
        return Err(ExclusionReason::NonPositiveDenominator {
            field: def.denominator.clone(),
        });
    }
    if numerator > denominator {
        return Err(ExclusionReason::NumeratorExceedsDenominator {
            feature: def.name.clone(),
        });
    }
    let ratio = numerator / denominator;
    let value = apply_transform(def.transform, ratio, def.log_floor.unwrap_or(0.0));
    if !ratio.is_finite() || !value.is_finite() {
        return Err(ExclusionReason::NonFinite {
            feature: def.name.clone(),
        });
    }
    Ok((ratio, value))
}

/// Compute every feature for one unit, or the first reason it must be excluded.
pub fn derive_unit(
    unit: &Unit,
    defs: &[FeatureDef],
) -> std::result::Result<(Vec<f64>, Vec<f64>), ExclusionReason> {
    let mut raw = Vec::with_capacity(defs.len());
    let mut values = Vec::with_capacity(defs.len());
    for def in defs {
        let (ratio, value) = derive_feature(unit, def)?;
        raw.push(ratio);
        values.push(value);
    }
    Ok((raw, values))
}

/// Transform a batch of units into a feature matrix.
///
/// Fails only when no features are configured. Units that cannot be
/// transformed are listed in the report.
pub fn transform_units(units: &[Unit], defs: &[FeatureDef]) -> Result<(FeatureMatrix, TransformReport)> {
    if defs.is_empty() {
        return Err(Error::invalid("features", "at least one feature is required"));
    }
    let d = defs.len();

    let mut ids = Vec::new();
    let mut names = Vec::new();
    let mut raw_flat = Vec::new();
    let mut value_flat = Vec::new();
    let mut excluded = Vec::new();

    for unit in units {
        match derive_unit(unit, defs) {
            Ok((raw, values)) => {
                ids.push(unit.id.clone());
                names.push(unit.name.clone());
                raw_flat.extend(raw);
                value_flat.extend(values);
            }
            Err(reason) => excluded.push(Exclusion {
                id: unit.id.clone(),
                reason,
            }),
        }
    }

    let n = ids.len();
    let got = value_flat.len();
    let values = Matrix::from_vec(n, d, value_flat).ok_or(Error::DimensionMismatch {
        expected: n * d,
        got,
    })?;
    let got = raw_flat.len();
    let raw = Matrix::from_vec(n, d, raw_flat).ok_or(Error::DimensionMismatch {
        expected: n * d,
        got,
    })?;

    let report = TransformReport {
        total: units.len(),
        retained: n,
        excluded,
    };
    let matrix = FeatureMatrix {
        feature_names: defs.iter().map(|f| f.name.clone()).collect(),
        ids,
        names,
        values,
        raw,
    };
    Ok((matrix, report))
}
