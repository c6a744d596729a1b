//! Configuration validation errors and semantic validation.
//!
//! Validation runs before any data is read or any model is fitted. Every
//! failure names the offending field so the caller can fix it directly.

use crate::config::{FitOptions, OutputOptions, TypologyConfig};
use crate::features::FeatureDef;
use std::collections::HashSet;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }

    /// Field the error refers to, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidValue { field, .. } => Some(field),
            ValidationError::VersionMismatch { .. } => Some("schema_version"),
            _ => None,
        }
    }
}

impl From<ValidationError> for tt_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidValue { field, message } => {
                tt_common::Error::InvalidParameter {
                    name: field,
                    message,
                }
            }
            other => tt_common::Error::Config(other.to_string()),
        }
    }
}

fn invalid(field: impl Into<String>, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        message,
    }
}

/// Validate a full configuration.
pub fn validate_config(config: &TypologyConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_features(&config.features)?;
    validate_fit(&config.fit)?;
    validate_output(&config.output)?;

    Ok(())
}

/// Validate the feature list.
pub fn validate_features(features: &[FeatureDef]) -> ValidationResult<()> {
    if features.is_empty() {
        return Err(invalid("features", "Must list at least one feature".to_string()));
    }

    let mut seen = HashSet::new();
    for (i, def) in features.iter().enumerate() {
        let field = format!("features[{}]", i);
        if def.name.trim().is_empty() {
            return Err(invalid(format!("{}.name", field), "Must not be empty".to_string()));
        }
        if !seen.insert(def.name.as_str()) {
            return Err(invalid(
                format!("{}.name", field),
                format!("Duplicate feature name '{}'", def.name),
            ));
        }
        if def.numerator.trim().is_empty() {
            return Err(invalid(
                format!("{}.numerator", field),
                "Must name a count field".to_string(),
            ));
        }
        if def.denominator.trim().is_empty() {
            return Err(invalid(
                format!("{}.denominator", field),
                "Must name a count field".to_string(),
            ));
        }
        if def.transform.is_log() {
            match def.log_floor {
                Some(floor) if floor.is_finite() && floor > 0.0 => {}
                Some(floor) => {
                    return Err(invalid(
                        format!("{}.log_floor", field),
                        format!("Must be positive for {}, got {}", def.transform, floor),
                    ))
                }
                None => {
                    return Err(invalid(
                        format!("{}.log_floor", field),
                        format!("Required for {}", def.transform),
                    ))
                }
            }
        }
    }

    Ok(())
}

/// Validate estimation options.
pub fn validate_fit(fit: &FitOptions) -> ValidationResult<()> {
    if fit.min_classes < 1 {
        return Err(invalid(
            "fit.min_classes",
            format!("Must be >= 1, got {}", fit.min_classes),
        ));
    }
    if fit.max_classes < fit.min_classes {
        return Err(invalid(
            "fit.max_classes",
            format!(
                "Must be >= fit.min_classes ({}), got {}",
                fit.min_classes, fit.max_classes
            ),
        ));
    }
    if fit.structures.is_empty() {
        return Err(invalid(
            "fit.structures",
            "Must list at least one covariance structure".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for s in &fit.structures {
        if !seen.insert(*s) {
            return Err(invalid(
                "fit.structures",
                format!("Duplicate covariance structure {}", s),
            ));
        }
    }
    if fit.restarts < 1 {
        return Err(invalid(
            "fit.restarts",
            format!("Must be >= 1, got {}", fit.restarts),
        ));
    }
    if !(fit.tolerance.is_finite() && fit.tolerance > 0.0) {
        return Err(invalid(
            "fit.tolerance",
            format!("Must be positive, got {}", fit.tolerance),
        ));
    }
    if fit.max_iterations < 1 {
        return Err(invalid(
            "fit.max_iterations",
            format!("Must be >= 1, got {}", fit.max_iterations),
        ));
    }
    if !(fit.variance_floor.is_finite() && fit.variance_floor > 0.0) {
        return Err(invalid(
            "fit.variance_floor",
            format!("Must be positive, got {}", fit.variance_floor),
        ));
    }
    if !(fit.init_scale.is_finite() && fit.init_scale > 0.0) {
        return Err(invalid(
            "fit.init_scale",
            format!("Must be positive, got {}", fit.init_scale),
        ));
    }

    Ok(())
}

/// Validate output shaping options.
pub fn validate_output(output: &OutputOptions) -> ValidationResult<()> {
    if output.precision > 12 {
        return Err(invalid(
            "output.precision",
            format!("Must be in [0, 12], got {}", output.precision),
        ));
    }
    if !(0.0..=1.0).contains(&output.low_confidence) {
        return Err(invalid(
            "output.low_confidence",
            format!("Must be in [0, 1], got {}", output.low_confidence),
        ));
    }

    Ok(())
}
