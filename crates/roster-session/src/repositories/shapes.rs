//! Canonical projection shapes over the member record.

use roster_core::KernelResult;
use roster_core::types::{
    FromShape, ProjectionExpr, ProjectionField, ProjectionShape, ProjectionTerm, ShapeInstance,
};

/// Closed shape: only the `username` column. Served by a narrowed query.
pub fn username_only() -> ProjectionShape {
    ProjectionShape::new(vec![ProjectionField::column("username")])
}

/// Open shape: `username` plus a label derived from `username` and `age`,
/// computed after full-row fetch.
pub fn username_with_label() -> ProjectionShape {
    ProjectionShape::new(vec![
        ProjectionField::column("username"),
        ProjectionField::expression(
            "label",
            ProjectionExpr::concat(vec![
                ProjectionTerm::Column("username".into()),
                ProjectionTerm::Literal(" ".into()),
                ProjectionTerm::Column("age".into()),
            ]),
        ),
    ])
}

/// Nested shape: `username` plus the related team's `name`, resolved with
/// one team load per member row.
pub fn member_with_team() -> ProjectionShape {
    ProjectionShape::new(vec![
        ProjectionField::column("username"),
        ProjectionField::nested(
            "team",
            "team",
            ProjectionShape::new(vec![ProjectionField::column("name")]),
        ),
    ])
}

/// A typed closed projection carrying only the username.
#[derive(Debug, Clone, PartialEq)]
pub struct UsernameOnly {
    /// The member's username.
    pub username: String,
}

impl FromShape for UsernameOnly {
    fn shape() -> ProjectionShape {
        username_only()
    }

    fn from_instance(instance: &ShapeInstance) -> KernelResult<Self> {
        Ok(Self {
            username: instance.text("username")?.to_string(),
        })
    }
}
