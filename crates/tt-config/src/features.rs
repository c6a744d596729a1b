//! Feature definitions: which counts form each model feature.
//!
//! A feature is a ratio `numerator / denominator` over two count fields of a
//! unit, followed by a [`Transform`]. The default set describes census tracts
//! with five indicators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transform applied to a raw ratio `r = numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    /// `r`
    Proportion,
    /// `1 - r`
    Complement,
    /// `ln(r + floor)`
    LogProportion,
    /// `ln(1 - r + floor)`
    LogComplement,
}

impl Transform {
    /// Whether the transform takes a logarithm and therefore needs a floor.
    pub fn is_log(&self) -> bool {
        matches!(self, Transform::LogProportion | Transform::LogComplement)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transform::Proportion => "proportion",
            Transform::Complement => "complement",
            Transform::LogProportion => "log-proportion",
            Transform::LogComplement => "log-complement",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One model feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Column name used in output (`z_<name>`, `raw_<name>`).
    pub name: String,

    /// Count field holding the numerator.
    pub numerator: String,

    /// Count field holding the denominator.
    pub denominator: String,

    pub transform: Transform,

    /// Additive floor inside the logarithm. Required for log transforms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_floor: Option<f64>,
}

impl FeatureDef {
    pub fn new(
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
        transform: Transform,
    ) -> Self {
        Self {
            name: name.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            transform,
            log_floor: None,
        }
    }

    pub fn with_log_floor(mut self, floor: f64) -> Self {
        self.log_floor = Some(floor);
        self
    }
}

/// The five census-tract indicators.
pub fn default_features() -> Vec<FeatureDef> {
    vec![
        FeatureDef::new(
            "foreign_born",
            "native_born",
            "total_population",
            Transform::LogComplement,
        )
        .with_log_floor(0.01),
        FeatureDef::new(
            "renter_occupied",
            "renter_occupied",
            "occupied_units",
            Transform::Proportion,
        ),
        FeatureDef::new(
            "poverty",
            "below_poverty",
            "poverty_universe",
            Transform::Proportion,
        ),
        FeatureDef::new(
            "bachelors_plus",
            "bachelors_plus",
            "population_25_plus",
            Transform::Proportion,
        ),
        FeatureDef::new(
            "multi_unit_housing",
            "units_5_plus",
            "housing_units",
            Transform::Proportion,
        ),
    ]
}
