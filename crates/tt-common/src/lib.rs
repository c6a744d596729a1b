//! Tract Typology common types, IDs, and errors.
//!
//! This crate provides foundational types shared across tt-core modules:
//! - Areal unit records and identifiers
//! - The covariance structure vocabulary
//! - Common error types with stable codes
//! - Payload output formats

pub mod error;
pub mod id;
pub mod output;
pub mod structure;
pub mod unit;

pub use error::{Error, ErrorCategory, Result};
pub use id::UnitId;
pub use output::OutputFormat;
pub use structure::{CovarianceStructure, Shape, Sharing};
pub use unit::Unit;

/// Schema version for result payloads.
pub const SCHEMA_VERSION: &str = "1.0.0";
