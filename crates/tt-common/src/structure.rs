//! Covariance structure vocabulary for Gaussian mixtures.
//!
//! The structure is a closed enumeration: it decides the M-step update rule,
//! the density used in the E-step, and the parameter count used by the
//! information criteria. All three dispatch on this one type.
//!
//! | id  | variance across classes | shape     |
//! |-----|-------------------------|-----------|
//! | EII | equal                   | spherical |
//! | VII | varying                 | spherical |
//! | EEI | equal                   | diagonal  |
//! | VVI | varying                 | diagonal  |
//! | EEE | equal                   | full      |
//! | VVV | varying                 | full      |

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether covariance parameters are shared by all classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sharing {
    /// One covariance for every class.
    Equal,
    /// Class-specific covariances.
    Varying,
}

/// Shape of a single covariance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// `σ² I`
    Spherical,
    /// `diag(σ²_1..σ²_D)`, zero covariances
    Diagonal,
    /// Unconstrained symmetric positive definite
    Full,
}

/// One of the six covariance parameterisations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CovarianceStructure {
    /// Equal spherical.
    Eii,
    /// Varying spherical.
    Vii,
    /// Equal diagonal (LPA model 1).
    Eei,
    /// Varying diagonal (LPA model 2).
    Vvi,
    /// Equal full (LPA model 3).
    Eee,
    /// Varying full (LPA model 6).
    Vvv,
}

impl CovarianceStructure {
    /// All structures in canonical order.
    pub const ALL: [CovarianceStructure; 6] = [
        CovarianceStructure::Eii,
        CovarianceStructure::Vii,
        CovarianceStructure::Eei,
        CovarianceStructure::Vvi,
        CovarianceStructure::Eee,
        CovarianceStructure::Vvv,
    ];

    /// Three-letter identifier.
    pub fn id(&self) -> &'static str {
        match self {
            CovarianceStructure::Eii => "EII",
            CovarianceStructure::Vii => "VII",
            CovarianceStructure::Eei => "EEI",
            CovarianceStructure::Vvi => "VVI",
            CovarianceStructure::Eee => "EEE",
            CovarianceStructure::Vvv => "VVV",
        }
    }

    /// Short description for tables and help output.
    pub fn description(&self) -> &'static str {
        match self {
            CovarianceStructure::Eii => "equal variances, spherical",
            CovarianceStructure::Vii => "varying variances, spherical",
            CovarianceStructure::Eei => "equal variances, covariances fixed to zero",
            CovarianceStructure::Vvi => "varying variances, covariances fixed to zero",
            CovarianceStructure::Eee => "equal variances and covariances",
            CovarianceStructure::Vvv => "varying variances and covariances",
        }
    }

    pub fn sharing(&self) -> Sharing {
        match self {
            CovarianceStructure::Eii | CovarianceStructure::Eei | CovarianceStructure::Eee => {
                Sharing::Equal
            }
            CovarianceStructure::Vii | CovarianceStructure::Vvi | CovarianceStructure::Vvv => {
                Sharing::Varying
            }
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            CovarianceStructure::Eii | CovarianceStructure::Vii => Shape::Spherical,
            CovarianceStructure::Eei | CovarianceStructure::Vvi => Shape::Diagonal,
            CovarianceStructure::Eee | CovarianceStructure::Vvv => Shape::Full,
        }
    }

    /// Stable small integer used when deriving per-restart seeds.
    pub fn ordinal(&self) -> u64 {
        match self {
            CovarianceStructure::Eii => 0,
            CovarianceStructure::Vii => 1,
            CovarianceStructure::Eei => 2,
            CovarianceStructure::Vvi => 3,
            CovarianceStructure::Eee => 4,
            CovarianceStructure::Vvv => 5,
        }
    }

    /// Number of free covariance parameters for `k` classes in `d` dimensions.
    pub fn covariance_parameters(&self, k: usize, d: usize) -> usize {
        let per_matrix = match self.shape() {
            Shape::Spherical => 1,
            Shape::Diagonal => d,
            Shape::Full => d * (d + 1) / 2,
        };
        match self.sharing() {
            Sharing::Equal => per_matrix,
            Sharing::Varying => k * per_matrix,
        }
    }

    /// Total free parameters: `(k - 1)` weights, `k·d` means, plus covariance.
    pub fn parameter_count(&self, k: usize, d: usize) -> usize {
        k.saturating_sub(1) + k * d + self.covariance_parameters(k, d)
    }
}

impl fmt::Display for CovarianceStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for CovarianceStructure {
    type Err = Error;

    /// Accepts three-letter ids (any case) and the LPA model numbers 1, 2, 3, 6.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EII" => Ok(CovarianceStructure::Eii),
            "VII" => Ok(CovarianceStructure::Vii),
            "EEI" | "1" => Ok(CovarianceStructure::Eei),
            "VVI" | "2" => Ok(CovarianceStructure::Vvi),
            "EEE" | "3" => Ok(CovarianceStructure::Eee),
            "VVV" | "6" => Ok(CovarianceStructure::Vvv),
            _ => Err(Error::UnknownStructure(s.to_string())),
        }
    }
}

impl TryFrom<String> for CovarianceStructure {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CovarianceStructure> for String {
    fn from(value: CovarianceStructure) -> Self {
        value.id().to_string()
    }
}
