//! Raw result rows returned by a store backend.

use serde::{Deserialize, Serialize};

use crate::error::KernelError;
use crate::result::KernelResult;
use crate::types::value::Value;

/// A single result row: an ordered list of named cells.
///
/// Column order follows the statement's column set; lookups are by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs(cells: Vec<(String, Value)>) -> Self {
        Self { cells }
    }

    /// Append a cell.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.push((column.into(), value.into()));
    }

    /// Set a cell, replacing an existing one with the same column name.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| name == column) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    /// Look up a cell by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Look up a required cell, failing with `SchemaMismatch` if absent.
    pub fn require(&self, column: &str) -> KernelResult<&Value> {
        self.get(column).ok_or_else(|| {
            KernelError::schema_mismatch(format!("Row is missing required column '{column}'"))
        })
    }

    /// Look up a required integer cell. Absence or another type fails
    /// with `SchemaMismatch`.
    pub fn require_i64(&self, column: &str) -> KernelResult<i64> {
        self.require(column)?.as_i64().ok_or_else(|| {
            KernelError::schema_mismatch(format!("Column '{column}' is not an integer"))
        })
    }

    /// Look up a required text cell. Absence or another type fails with
    /// `SchemaMismatch`.
    pub fn require_text(&self, column: &str) -> KernelResult<&str> {
        self.require(column)?.as_str().ok_or_else(|| {
            KernelError::schema_mismatch(format!("Column '{column}' is not text"))
        })
    }

    /// Iterate over `(column, value)` pairs in statement order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of cells in the row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
