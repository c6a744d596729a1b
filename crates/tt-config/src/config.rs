//! The typed configuration document.
//!
//! Every option the estimator reads is spelled out here. Nothing in the
//! engine has a hidden default: a run either loads a file, takes a preset,
//! or uses [`TypologyConfig::default`], which is the `standard` preset, and
//! the source is always reported.

use crate::features::FeatureDef;
use crate::validate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tt_common::CovarianceStructure;

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypologyConfig {
    pub schema_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered feature list; order fixes the column order of the matrix.
    pub features: Vec<FeatureDef>,

    pub fit: FitOptions,

    pub output: OutputOptions,
}

/// Estimation options shared by every candidate in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Smallest class count to fit.
    pub min_classes: usize,

    /// Largest class count to fit (inclusive).
    pub max_classes: usize,

    /// Covariance structures to fit.
    pub structures: Vec<CovarianceStructure>,

    /// Random restarts per candidate.
    pub restarts: usize,

    /// Absolute log-likelihood improvement below which EM stops.
    pub tolerance: f64,

    pub max_iterations: usize,

    pub seed: u64,

    /// Minimum variance (eigenvalue) allowed in any covariance.
    pub variance_floor: f64,

    pub init: InitStrategy,

    /// Initial covariance is `init_scale · I`.
    pub init_scale: f64,

    /// Worker threads for restarts and candidates; 0 uses the rayon default.
    #[serde(default)]
    pub threads: usize,
}

/// Output shaping options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Decimal places for numeric output columns.
    pub precision: u32,

    /// Units whose largest posterior is below this are counted as low confidence.
    pub low_confidence: f64,
}

/// Initialisation strategy for each EM restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InitStrategy {
    /// Uniform random hard assignment, means are class averages.
    #[serde(rename = "random-partition")]
    RandomPartition,
    /// D²-weighted seeding of the means.
    #[serde(rename = "kmeans++")]
    KMeansPlusPlus,
}

impl InitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InitStrategy::RandomPartition => "random-partition",
            InitStrategy::KMeansPlusPlus => "kmeans++",
        }
    }
}

impl fmt::Display for InitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InitStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random-partition" | "random" => Ok(InitStrategy::RandomPartition),
            "kmeans++" | "kmeans" => Ok(InitStrategy::KMeansPlusPlus),
            other => Err(ValidationError::InvalidValue {
                field: "fit.init".to_string(),
                message: format!("Must be random-partition or kmeans++, got {}", other),
            }),
        }
    }
}

impl Default for TypologyConfig {
    fn default() -> Self {
        crate::preset::get_preset(crate::preset::PresetName::Standard)
    }
}

impl TypologyConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Feature names in column order.
    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// Class counts to fit, ascending.
    pub fn class_counts(&self) -> std::ops::RangeInclusive<usize> {
        self.fit.min_classes..=self.fit.max_classes
    }

    /// Number of candidate models in a full sweep.
    pub fn candidate_count(&self) -> usize {
        if self.fit.max_classes < self.fit.min_classes {
            return 0;
        }
        (self.fit.max_classes - self.fit.min_classes + 1) * self.fit.structures.len()
    }
}
