//! Areal unit identity.
//!
//! Identifiers are opaque strings (census GEOIDs in practice). They are
//! carried through the pipeline unchanged and used to join results back to
//! source records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an areal unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    /// Parse an identifier, trimming surrounding whitespace.
    ///
    /// Returns None for empty identifiers.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(UnitId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        UnitId(s.to_string())
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        UnitId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_empty() {
        assert_eq!(UnitId::parse(" 36061000100 ").unwrap().as_str(), "36061000100");
        assert!(UnitId::parse("   ").is_none());
    }

    #[test]
    fn serializes_transparently() {
        let id = UnitId::from("06075010100");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"06075010100\"");
    }
}
