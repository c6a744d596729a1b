//! Tract Typology configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for `tract_typology.json`
//! - Built-in presets (quick, standard, thorough)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation naming the offending field
//! - Config snapshots for reproducible runs

pub mod config;
pub mod features;
pub mod load;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use config::{FitOptions, InitStrategy, OutputOptions, TypologyConfig};
pub use features::{default_features, FeatureDef, Transform};
pub use load::{load_config, LoadedConfig};
pub use preset::{get_preset, list_presets, PresetName};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Standard configuration file name.
pub const CONFIG_FILENAME: &str = "tract_typology.json";
