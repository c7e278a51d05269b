//! Member entity model.

use serde::{Deserialize, Serialize};

use roster_core::KernelResult;
use roster_core::types::{Row, Value};

use crate::audit::AuditBlock;
use crate::record::{Record, RelationDef};
use crate::relation::Relation;
use crate::team::Team;

/// A registered member of the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Store-assigned identity.
    pub id: Option<i64>,
    /// Login name.
    pub username: String,
    /// Age in years.
    pub age: i32,
    /// The team this member belongs to, if any. Lazily resolved.
    pub team: Option<Relation<Team>>,
    /// Optimistic concurrency version stamp.
    pub version: i64,
    /// Audit metadata, populated by the mapper.
    pub audit: AuditBlock,
}

impl Member {
    /// Create a new, not-yet-persisted member with no team.
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team: None,
            version: 0,
            audit: AuditBlock::default(),
        }
    }

    /// Create a new member assigned to an already-persisted team.
    pub fn with_team(username: impl Into<String>, age: i32, team_id: i64) -> Self {
        let mut member = Self::new(username, age);
        member.team = Some(Relation::unloaded(team_id));
        member
    }

    /// The assigned team's identity, if any.
    pub fn team_id(&self) -> Option<i64> {
        self.team.as_ref().and_then(Relation::target_id)
    }
}

impl Record for Member {
    fn table() -> &'static str {
        "member"
    }

    fn columns() -> &'static [&'static str] {
        &[
            "id",
            "username",
            "age",
            "team_id",
            "version",
            "created_at",
            "updated_at",
            "created_by",
            "updated_by",
        ]
    }

    fn relations() -> &'static [RelationDef] {
        &[RelationDef {
            name: "team",
            column: "team_id",
            target_table: "team",
        }]
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
        row.push("username", self.username.as_str());
        row.push("age", self.age);
        row.push("team_id", Value::from(self.team_id()));
        row.push("version", self.version);
        self.audit.write_to(&mut row);
        row
    }

    fn from_row(row: &Row) -> KernelResult<Self> {
        let team = match row.require("team_id")? {
            Value::Null => None,
            value => value.as_i64().map(Relation::unloaded),
        };
        Ok(Self {
            id: Some(row.require_i64("id")?),
            username: row.require_text("username")?.to_string(),
            age: row.require_i64("age")? as i32,
            team,
            version: row.require_i64("version")?,
            audit: AuditBlock::read_from(row)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_round_trip() {
        let mut member = Member::with_team("member1", 10, 3);
        member.id = Some(42);
        member.version = 2;

        let row = member.to_row();
        let back = Member::from_row(&row).unwrap();

        assert_eq!(back.id, Some(42));
        assert_eq!(back.username, "member1");
        assert_eq!(back.age, 10);
        assert_eq!(back.team_id(), Some(3));
        assert_eq!(back.version, 2);
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let mut row = Row::new();
        row.push("id", 1i64);
        row.push("username", "member1");

        let err = Member::from_row(&row).unwrap_err();
        assert_eq!(err.kind, roster_core::error::ErrorKind::SchemaMismatch);
    }
}
