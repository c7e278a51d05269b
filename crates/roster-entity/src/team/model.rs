//! Team entity model.

use serde::{Deserialize, Serialize};

use roster_core::KernelResult;
use roster_core::types::{Row, Value};

use crate::audit::AuditBlock;
use crate::record::Record;

/// A team that members belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Store-assigned identity.
    pub id: Option<i64>,
    /// Team name.
    pub name: String,
    /// Optimistic concurrency version stamp.
    pub version: i64,
    /// Audit metadata, populated by the mapper.
    pub audit: AuditBlock,
}

impl Team {
    /// Create a new, not-yet-persisted team.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            version: 0,
            audit: AuditBlock::default(),
        }
    }
}

impl Record for Team {
    fn table() -> &'static str {
        "team"
    }

    fn columns() -> &'static [&'static str] {
        &[
            "id",
            "name",
            "version",
            "created_at",
            "updated_at",
            "created_by",
            "updated_by",
        ]
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn audit(&self) -> &AuditBlock {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.push("id", Value::from(self.id));
        row.push("name", self.name.as_str());
        row.push("version", self.version);
        self.audit.write_to(&mut row);
        row
    }

    fn from_row(row: &Row) -> KernelResult<Self> {
        Ok(Self {
            id: Some(row.require_i64("id")?),
            name: row.require_text("name")?.to_string(),
            version: row.require_i64("version")?,
            audit: AuditBlock::read_from(row)?,
        })
    }
}
