//! The embedded audit block carried by every record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use roster_core::KernelResult;
use roster_core::types::{Row, Value};

/// Audit metadata embedded in a record.
///
/// The block is populated by the mapper's lifecycle hooks, never by the
/// caller: `before_insert` stamps the created fields and copies them into
/// the updated fields, `before_update` stamps only the updated fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditBlock {
    /// When the record was inserted.
    pub created_at: Option<DateTime<Utc>>,
    /// When the record was last updated.
    pub updated_at: Option<DateTime<Utc>>,
    /// The actor who inserted the record.
    pub created_by: Option<String>,
    /// The actor who last updated the record.
    pub updated_by: Option<String>,
}

impl AuditBlock {
    /// Whether the insert hook has already stamped this block.
    pub fn is_stamped(&self) -> bool {
        self.created_at.is_some()
    }

    /// Write the audit columns into a row.
    pub fn write_to(&self, row: &mut Row) {
        row.set("created_at", Value::from(self.created_at));
        row.set("updated_at", Value::from(self.updated_at));
        row.set("created_by", Value::from(self.created_by.clone()));
        row.set("updated_by", Value::from(self.updated_by.clone()));
    }

    /// Read the audit columns from a row.
    pub fn read_from(row: &Row) -> KernelResult<Self> {
        Ok(Self {
            created_at: row.require("created_at")?.as_timestamp(),
            updated_at: row.require("updated_at")?.as_timestamp(),
            created_by: row.require("created_by")?.as_str().map(str::to_string),
            updated_by: row.require("updated_by")?.as_str().map(str::to_string),
        })
    }
}
