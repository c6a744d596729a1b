//! Configuration snapshots for reproducibility.
//!
//! A snapshot captures the exact configuration a run used, so a result can
//! be matched to the options that produced it and the run repeated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::TypologyConfig;
use crate::resolve::ConfigPaths;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the configuration was loaded from.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Source of the configuration.
    pub config_source: String,

    /// SHA-256 of the canonical JSON of the resolved configuration.
    pub config_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub features: Vec<String>,
    pub min_classes: usize,
    pub max_classes: usize,
    pub structures: Vec<String>,
    pub restarts: usize,
    pub seed: u64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub variance_floor: f64,
    pub init: String,
}

impl ConfigSnapshot {
    /// Create a snapshot of a resolved configuration.
    pub fn new(config: &TypologyConfig, paths: &ConfigPaths) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_path: paths.config.as_ref().map(|p| p.display().to_string()),
            config_source: paths.source.to_string(),
            config_hash: config_hash(config),
            summary: ConfigSummary::from_config(config),
        }
    }

    /// First 12 hex digits of the hash, for report headers.
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

impl ConfigSummary {
    fn from_config(config: &TypologyConfig) -> Self {
        ConfigSummary {
            features: config.feature_names(),
            min_classes: config.fit.min_classes,
            max_classes: config.fit.max_classes,
            structures: config.fit.structures.iter().map(|s| s.to_string()).collect(),
            restarts: config.fit.restarts,
            seed: config.fit.seed,
            tolerance: config.fit.tolerance,
            max_iterations: config.fit.max_iterations,
            variance_floor: config.fit.variance_floor,
            init: config.fit.init.to_string(),
        }
    }
}

/// Hash of the canonical JSON form of a configuration.
///
/// Struct fields serialize in declaration order, so equal configs hash equal
/// regardless of how the source file was formatted.
pub fn config_hash(config: &TypologyConfig) -> String {
    let canonical = serde_json::to_vec(config).unwrap_or_default();
    hex::encode(Sha256::digest(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ConfigSource;

    fn defaults_snapshot() -> ConfigSnapshot {
        ConfigSnapshot::new(&TypologyConfig::default(), &ConfigPaths::default())
    }

    #[test]
    fn test_defaults_snapshot() {
        let snapshot = defaults_snapshot();
        assert_eq!(snapshot.schema_version, crate::CONFIG_SCHEMA_VERSION);
        assert!(snapshot.config_path.is_none());
        assert_eq!(
            snapshot.config_source,
            ConfigSource::BuiltinDefault.to_string()
        );
        assert_eq!(snapshot.summary.features.len(), 5);
    }

    #[test]
    fn test_snapshot_short_id() {
        assert_eq!(defaults_snapshot().short_id().len(), 12);
    }

    #[test]
    fn hash_is_stable_and_seed_sensitive() {
        assert_eq!(defaults_snapshot().config_hash, defaults_snapshot().config_hash);
        assert_eq!(defaults_snapshot().config_hash.len(), 64);

        let mut cfg = TypologyConfig::default();
        cfg.fit.seed += 1;
        let other = ConfigSnapshot::new(&cfg, &ConfigPaths::default());
        assert_ne!(defaults_snapshot().config_hash, other.config_hash);
    }

    #[test]
    fn snapshot_survives_json() {
        let snapshot = defaults_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: ConfigSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.config_hash, snapshot.config_hash);
        assert_eq!(restored.summary.seed, snapshot.summary.seed);
    }
}
