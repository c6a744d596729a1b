//! Raw areal unit records as supplied by the ingestion layer.

use crate::id::UnitId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One areal record: identifier, display name, and raw counts.
///
/// Counts may be missing entirely or present as `null`; both are treated
/// as absent by [`Unit::count`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub counts: BTreeMap<String, Option<f64>>,
}

impl Unit {
    /// Create a unit with no counts.
    pub fn new(id: impl Into<UnitId>, name: impl Into<String>) -> Self {
        Unit {
            id: id.into(),
            name: name.into(),
            counts: BTreeMap::new(),
        }
    }

    /// Builder-style count setter.
    pub fn with_count(mut self, field: impl Into<String>, value: f64) -> Self {
        self.counts.insert(field.into(), Some(value));
        self
    }

    /// Builder-style explicit missing value.
    pub fn with_missing(mut self, field: impl Into<String>) -> Self {
        self.counts.insert(field.into(), None);
        self
    }

    /// Value of a raw count field, None when absent or null.
    pub fn count(&self, field: &str) -> Option<f64> {
        self.counts.get(field).copied().flatten()
    }
}
