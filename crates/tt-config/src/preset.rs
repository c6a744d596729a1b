//! Configuration presets for common sweep sizes.
//!
//! Provides pre-built configurations for:
//! - Quick: small class range, diagonal structures, few restarts
//! - Standard: the usual LPA sweep over models 1, 2, 3 and 6
//! - Thorough: every structure, wide class range, many restarts

use crate::config::{FitOptions, InitStrategy, OutputOptions, TypologyConfig};
use crate::features::default_features;
use serde::{Deserialize, Serialize};
use std::fmt;
use tt_common::CovarianceStructure;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// k 1..4, EEI/VVI, 5 restarts
    Quick,
    /// k 1..6, EEI/VVI/EEE/VVV, 10 restarts
    Standard,
    /// k 1..8, all six structures, 25 restarts
    Thorough,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] =
        &[PresetName::Quick, PresetName::Standard, PresetName::Thorough];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Quick => "quick",
            PresetName::Standard => "standard",
            PresetName::Thorough => "thorough",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "quick" | "fast" => Some(PresetName::Quick),
            "standard" | "default" => Some(PresetName::Standard),
            "thorough" | "full" => Some(PresetName::Thorough),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Quick => "Small sweep for exploration: diagonal models, k up to 4",
            PresetName::Standard => "Usual latent profile sweep: models 1, 2, 3, 6 with k up to 6",
            PresetName::Thorough => "All six covariance structures, k up to 8, many restarts",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Get the configuration for a preset.
pub fn get_preset(name: PresetName) -> TypologyConfig {
    let fit = match name {
        PresetName::Quick => FitOptions {
            min_classes: 1,
            max_classes: 4,
            structures: vec![CovarianceStructure::Eei, CovarianceStructure::Vvi],
            restarts: 5,
            tolerance: 1e-6,
            max_iterations: 500,
            ..base_fit()
        },
        PresetName::Standard => base_fit(),
        PresetName::Thorough => FitOptions {
            min_classes: 1,
            max_classes: 8,
            structures: CovarianceStructure::ALL.to_vec(),
            restarts: 25,
            tolerance: 1e-8,
            max_iterations: 2000,
            ..base_fit()
        },
    };

    TypologyConfig {
        schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
        description: Some(format!("preset:{}", name.as_str())),
        features: default_features(),
        fit,
        output: OutputOptions {
            precision: 4,
            low_confidence: 0.8,
        },
    }
}

fn base_fit() -> FitOptions {
    FitOptions {
        min_classes: 1,
        max_classes: 6,
        structures: vec![
            CovarianceStructure::Eei,
            CovarianceStructure::Vvi,
            CovarianceStructure::Eee,
            CovarianceStructure::Vvv,
        ],
        restarts: 10,
        tolerance: 1e-6,
        max_iterations: 1000,
        seed: 36,
        variance_floor: 1e-6,
        init: InitStrategy::KMeansPlusPlus,
        init_scale: 1.0,
        threads: 0,
    }
}

/// Information about a preset for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
    pub min_classes: usize,
    pub max_classes: usize,
    pub structures: Vec<CovarianceStructure>,
    pub restarts: usize,
    pub max_iterations: usize,
}

impl PresetInfo {
    /// Create info from a preset.
    pub fn from_preset(name: PresetName) -> Self {
        let config = get_preset(name);
        Self {
            name: name.as_str().to_string(),
            description: name.description().to_string(),
            min_classes: config.fit.min_classes,
            max_classes: config.fit.max_classes,
            structures: config.fit.structures,
            restarts: config.fit.restarts,
            max_iterations: config.fit.max_iterations,
        }
    }
}

/// List all available presets with summary information.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|&name| PresetInfo::from_preset(name))
        .collect()
}
