//! Joins classifications back onto unit identifiers as a flat table.

use serde::{Deserialize, Serialize};
use std::fmt;
use tt_common::{Error, Result};
use tt_math::Matrix;

use crate::classify::ClassificationResult;
use crate::features::FeatureMatrix;

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Id,
    Name,
    Class,
    /// Posterior of class `j`, 1-based.
    Posterior(usize),
    /// Standardized value of a feature.
    Standardized(String),
    /// Raw ratio of a feature.
    Raw(String),
}

impl Column {
    pub fn header(&self) -> String {
        match self {
            Column::Id => "id".to_string(),
            Column::Name => "name".to_string(),
            Column::Class => "class".to_string(),
            Column::Posterior(j) => format!("p_{}", j),
            Column::Standardized(f) => format!("z_{}", f),
            Column::Raw(f) => format!("raw_{}", f),
        }
    }

    /// Parse a header against the class count and feature names in play.
    pub fn parse(name: &str, k: usize, features: &[String]) -> Result<Column> {
        let unknown = || Error::UnknownColumn(name.to_string());
        match name {
            "id" => return Ok(Column::Id),
            "name" => return Ok(Column::Name),
            "class" => return Ok(Column::Class),
            _ => {}
        }
        if let Some(j) = name.strip_prefix("p_") {
            let j: usize = j.parse().map_err(|_| unknown())?;
            return if (1..=k).contains(&j) {
                Ok(Column::Posterior(j))
            } else {
                Err(unknown())
            };
        }
        if let Some(f) = name.strip_prefix("z_") {
            if features.iter().any(|x| x == f) {
                return Ok(Column::Standardized(f.to_string()));
            }
        }
        if let Some(f) = name.strip_prefix("raw_") {
            if features.iter().any(|x| x == f) {
                return Ok(Column::Raw(f.to_string()));
            }
        }
        Err(unknown())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// Ordered list of output columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub columns: Vec<Column>,
}

impl ColumnSchema {
    /// id, name, class, every posterior, every standardized value, every raw ratio.
    pub fn default_for(k: usize, features: &[String]) -> Self {
        let mut columns = vec![Column::Id, Column::Name, Column::Class];
        columns.extend((1..=k).map(Column::Posterior));
        columns.extend(features.iter().cloned().map(Column::Standardized));
        columns.extend(features.iter().cloned().map(Column::Raw));
        ColumnSchema { columns }
    }

    /// Caller-ordered schema; any unknown header is rejected.
    pub fn from_names<S: AsRef<str>>(names: &[S], k: usize, features: &[String]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|n| Column::parse(n.as_ref().trim(), k, features))
            .collect::<Result<Vec<_>>>()?;
        if columns.is_empty() {
            return Err(Error::invalid("columns", "at least one column is required"));
        }
        Ok(ColumnSchema { columns })
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(Column::header).collect()
    }
}

/// One cell of the output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Label(usize),
    Number(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Label(l) => write!(f, "{}", l),
            Cell::Number(v) => write!(f, "{}", v),
        }
    }
}

/// Rows of cells under named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl OutputTable {
    /// Rows as JSON objects keyed by column header.
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(c, cell)| (c.clone(), serde_json::json!(cell)))
                    .collect()
            })
            .collect()
    }
}

/// Round to `precision` decimal places; non-finite values pass through.
pub fn round_to(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(precision as i32);
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Builds the output table for a classification.
#[derive(Debug, Clone, Copy)]
pub struct ResultMerger {
    precision: u32,
}

impl Default for ResultMerger {
    fn default() -> Self {
        ResultMerger { precision: 4 }
    }
}

impl ResultMerger {
    pub fn new(precision: u32) -> Self {
        ResultMerger { precision }
    }

    pub fn merge(
        &self,
        result: &ClassificationResult,
        features: &FeatureMatrix,
        standardized: &Matrix,
        schema: &ColumnSchema,
    ) -> Result<OutputTable> {
        let n = result.units.len();
        if features.len() != n || standardized.rows() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                got: features.len().min(standardized.rows()),
            });
        }

        let feature_index = |f: &str| -> Result<usize> {
            features
                .feature_names
                .iter()
                .position(|x| x == f)
                .ok_or_else(|| Error::UnknownColumn(f.to_string()))
        };
        // resolve feature positions once
        let resolved: Vec<(Column, Option<usize>)> = schema
            .columns
            .iter()
            .map(|c| match c {
                Column::Standardized(f) | Column::Raw(f) => {
                    feature_index(f).map(|i| (c.clone(), Some(i)))
                }
                Column::Posterior(j) if *j == 0 || *j > result.summary.k => {
                    Err(Error::UnknownColumn(c.header()))
                }
                _ => Ok((c.clone(), None)),
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = result
            .units
            .iter()
            .enumerate()
            .map(|(i, unit)| {
                resolved
                    .iter()
                    .map(|(c, idx)| match (c, idx) {
                        (Column::Id, _) => Cell::Text(unit.id.to_string()),
                        (Column::Name, _) => Cell::Text(unit.name.clone()),
                        (Column::Class, _) => Cell::Label(unit.label),
                        (Column::Posterior(j), _) => {
                            Cell::Number(round_to(unit.posteriors[j - 1], self.precision))
                        }
                        (Column::Standardized(_), Some(c)) => {
                            Cell::Number(round_to(standardized.get(i, *c), self.precision))
                        }
                        (Column::Raw(_), Some(c)) => {
                            Cell::Number(round_to(features.raw.get(i, *c), self.precision))
                        }
                        (Column::Standardized(_) | Column::Raw(_), None) => Cell::Number(f64::NAN),
                    })
                    .collect()
            })
            .collect();

        Ok(OutputTable {
            columns: schema.headers(),
            rows,
        })
    }
}
