//! Tract Typology Core Library
//!
//! This library classifies areal units into latent residential typologies
//! with Gaussian finite mixtures:
//! - Feature derivation from raw counts and standardization
//! - EM estimation under six covariance structures with seeded restarts
//! - Model comparison by information criteria and entropy
//! - Classification, class profiles, and merged output tables
//! - Logging, output rendering, and exit codes for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod classify;
pub mod exit_codes;
pub mod features;
pub mod input;
pub mod logging;
pub mod merge;
pub mod mixture;
pub mod output;
pub mod pipeline;
pub mod select;
pub mod standardize;
pub mod synthetic;

pub use classify::{ClassificationAssigner, ClassificationResult, ClassifiedUnit, ClassProfile};
pub use features::{transform_units, FeatureMatrix, TransformReport};
pub use merge::{ColumnSchema, OutputTable, ResultMerger};
pub use mixture::{EstimatorOptions, FittedModel, MixtureModelEstimator};
pub use pipeline::{Pipeline, PreparedData};
pub use select::{ComparisonRow, ComparisonTable, Criterion, ModelSelector};
pub use standardize::Standardizer;
