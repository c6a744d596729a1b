//! Error type shared by every tt crate.
//!
//! Each variant has a stable numeric code (10-19 config, 20-29 input,
//! 30-39 estimation, 60-69 I/O), a category, a short headline, and a
//! remediation hint. [`StructuredError`] is the JSON form written to stderr.
//!
//! Local numerical trouble inside a fit (underflow, singular covariance) is
//! never an `Error`: it is absorbed and reported as flags on the fitted
//! model. Errors here are structural or configuration failures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Tract Typology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration and option errors, rejected before any fitting.
    Config,
    /// Problems with the supplied units or derived feature matrix.
    Input,
    /// Estimation failures that are not absorbed as flags.
    Estimation,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Estimation => write!(f, "estimation"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Tract Typology.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {name}: {message}")]
    InvalidParameter { name: String, message: String },

    #[error("unknown covariance structure '{0}' (expected one of EII, VII, EEI, VVI, EEE, VVV)")]
    UnknownStructure(String),

    #[error("unknown output column '{0}'")]
    UnknownColumn(String),

    /// A configured feature is constant over the retained units, so it
    /// cannot be standardized.
    #[error("feature '{feature}' has zero variance across {rows} retained units")]
    DegenerateFeature { feature: String, rows: usize },

    // Input errors (20-29)
    #[error("no usable units: {0}")]
    EmptyInput(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Estimation errors (30-39)
    #[error("estimation failed: {0}")]
    Estimation(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    fn info(&self) -> ErrorInfo {
        use ErrorCategory::*;
        let (code, category, headline, remediation) = match self {
            Error::Config(_) => (
                10,
                Config,
                "Configuration Error",
                "Run 'tt-core check' to validate the configuration file.",
            ),
            Error::InvalidParameter { .. } => (
                11,
                Config,
                "Invalid Parameter",
                "Fix the named option on the command line or in the configuration file.",
            ),
            Error::UnknownStructure(_) => (
                12,
                Config,
                "Unknown Covariance Structure",
                "Use one of EII, VII, EEI, VVI, EEE, VVV (or model numbers 1, 2, 3, 6).",
            ),
            Error::UnknownColumn(_) => (
                13,
                Config,
                "Unknown Output Column",
                "Column names are id, name, class, p_<j>, z_<feature>, raw_<feature>.",
            ),
            Error::EmptyInput(_) => (
                20,
                Input,
                "No Usable Units",
                "Check that the input contains units with complete, positive denominators.",
            ),
            Error::DegenerateFeature { .. } => (
                14,
                Config,
                "Degenerate Feature",
                "Drop the feature from the configuration or widen the unit selection.",
            ),
            Error::DimensionMismatch { .. } => (
                22,
                Input,
                "Dimension Mismatch",
                "Internal shape mismatch between pipeline stages. Report as a bug.",
            ),
            Error::InvalidInput(_) => (
                23,
                Input,
                "Invalid Input",
                "Check the input file against the documented unit format.",
            ),
            Error::Estimation(_) => (
                30,
                Estimation,
                "Estimation Error",
                "Retry with more restarts or a different covariance structure.",
            ),
            Error::Io(_) => (
                60,
                Io,
                "I/O Error",
                "Check that the file exists and is readable.",
            ),
            Error::Json(_) => (
                61,
                Io,
                "JSON Parse Error",
                "Invalid JSON. Check syntax with 'jq .' on the file.",
            ),
        };
        ErrorInfo {
            code,
            category,
            headline,
            remediation,
        }
    }

    /// Stable numeric code.
    pub fn code(&self) -> u32 {
        self.info().code
    }

    pub fn category(&self) -> ErrorCategory {
        self.info().category
    }

    /// Short title for human-readable output.
    pub fn headline(&self) -> &'static str {
        self.info().headline
    }

    /// What the user can do about it.
    pub fn remediation(&self) -> &'static str {
        self.info().remediation
    }
}

struct ErrorInfo {
    code: u32,
    category: ErrorCategory,
    headline: &'static str,
    remediation: &'static str,
}

/// JSON form of an [`Error`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    /// Offending parameter, structure, column, or feature.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidParameter { name, .. } => {
                context.insert("parameter".to_string(), serde_json::json!(name));
            }
            Error::UnknownStructure(id) => {
                context.insert("structure".to_string(), serde_json::json!(id));
            }
            Error::UnknownColumn(column) => {
                context.insert("column".to_string(), serde_json::json!(column));
            }
            Error::DegenerateFeature { feature, rows } => {
                context.insert("feature".to_string(), serde_json::json!(feature));
                context.insert("rows".to_string(), serde_json::json!(rows));
            }
            Error::DimensionMismatch { expected, got } => {
                context.insert("expected".to_string(), serde_json::json!(expected));
                context.insert("got".to_string(), serde_json::json!(got));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

impl StructuredError {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Three-line stderr rendering:
///
/// ```text
/// ✗ Degenerate Feature
///   Reason: feature 'poverty' has zero variance across 212 retained units
///   Fix: Drop the feature from the configuration or widen the unit selection.
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
