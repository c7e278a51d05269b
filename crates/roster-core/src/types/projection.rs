//! Projection shapes: caller-declared output contracts.
//!
//! A shape is a tagged description of the requested output — a list of
//! named fields, each backed by a direct column, a post-fetch expression,
//! or a nested shape over a related record. Shapes are structural: nothing
//! is registered up front, and an unresolvable field surfaces at first
//! use, not at declaration time.

use serde::{Deserialize, Serialize};

use crate::error::KernelError;
use crate::result::KernelResult;
use crate::types::row::Row;
use crate::types::value::Value;

/// One term of a projection expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectionTerm {
    /// The display text of a source column's value.
    Column(String),
    /// A literal string.
    Literal(String),
}

/// A post-fetch expression over one or more source columns.
///
/// Evaluated against the full fetched row, so it may reference columns
/// outside any narrowed column set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionExpr {
    /// Terms concatenated in order.
    pub terms: Vec<ProjectionTerm>,
}

impl ProjectionExpr {
    /// Build a concatenation expression.
    pub fn concat(terms: Vec<ProjectionTerm>) -> Self {
        Self { terms }
    }

    /// Evaluate the expression against a fetched row.
    pub fn eval(&self, row: &Row) -> KernelResult<Value> {
        let mut out = String::new();
        for term in &self.terms {
            match term {
                ProjectionTerm::Literal(text) => out.push_str(text),
                ProjectionTerm::Column(column) => match row.get(column) {
                    Some(value) => out.push_str(&value.display_text()),
                    None => {
                        return Err(KernelError::unresolved_field(format!(
                            "Expression references column '{column}' which is not present in the source row"
                        )));
                    }
                },
            }
        }
        Ok(Value::Text(out))
    }
}

/// How a projection field is sourced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// A direct source column (closed).
    Column(String),
    /// An expression evaluated after full-row fetch (open).
    Expression(ProjectionExpr),
    /// A nested shape over a related record. Resolved through the relation
    /// accessor with one related-entity load per parent row.
    Nested {
        /// Relation name on the source record.
        relation: String,
        /// Shape applied to the related record.
        shape: ProjectionShape,
    },
}

/// A single named field of a projection shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionField {
    /// Output field name.
    pub name: String,
    /// How the field is sourced.
    pub kind: FieldKind,
}

impl ProjectionField {
    /// A closed field sourced from the column of the same name.
    pub fn column(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: FieldKind::Column(name.clone()),
            name,
        }
    }

    /// A closed field sourced from a differently named column.
    pub fn column_as(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Column(source.into()),
        }
    }

    /// An open field computed from an expression after full-row fetch.
    pub fn expression(name: impl Into<String>, expr: ProjectionExpr) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Expression(expr),
        }
    }

    /// A nested field projecting a related record.
    pub fn nested(
        name: impl Into<String>,
        relation: impl Into<String>,
        shape: ProjectionShape,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Nested {
                relation: relation.into(),
                shape,
            },
        }
    }
}

/// A caller-declared output contract: a set of named fields over a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionShape {
    /// The declared fields, in output order.
    pub fields: Vec<ProjectionField>,
}

impl ProjectionShape {
    /// Build a shape from fields.
    pub fn new(fields: Vec<ProjectionField>) -> Self {
        Self { fields }
    }

    /// Whether every field is a direct column with no nesting. Closed
    /// shapes can be served by a narrowed query.
    pub fn is_closed(&self) -> bool {
        self.fields
            .iter()
            .all(|field| matches!(field.kind, FieldKind::Column(_)))
    }

    /// The source columns of a closed shape, `None` if the shape is open
    /// or nested.
    pub fn source_columns(&self) -> Option<Vec<&str>> {
        self.fields
            .iter()
            .map(|field| match &field.kind {
                FieldKind::Column(source) => Some(source.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// The value of one materialized projection field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// A scalar column or expression result.
    Scalar(Value),
    /// A materialized nested shape.
    Nested(ShapeInstance),
}

impl FieldValue {
    /// The scalar value, if this field is one.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Nested(_) => None,
        }
    }

    /// The nested instance, if this field is one.
    pub fn as_nested(&self) -> Option<&ShapeInstance> {
        match self {
            Self::Nested(instance) => Some(instance),
            Self::Scalar(_) => None,
        }
    }
}

/// A materialized instance of a projection shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeInstance {
    fields: Vec<(String, FieldValue)>,
}

impl ShapeInstance {
    /// Build an instance from `(field, value)` pairs.
    pub fn from_pairs(fields: Vec<(String, FieldValue)>) -> Self {
        Self { fields }
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Look up a required scalar field, failing with
    /// `UnresolvedProjectionField` if the shape never declared it.
    pub fn scalar(&self, name: &str) -> KernelResult<&Value> {
        self.get(name)
            .and_then(FieldValue::as_scalar)
            .ok_or_else(|| {
                KernelError::unresolved_field(format!("Instance has no scalar field '{name}'"))
            })
    }

    /// Look up a required nested field.
    pub fn nested(&self, name: &str) -> KernelResult<&ShapeInstance> {
        self.get(name)
            .and_then(FieldValue::as_nested)
            .ok_or_else(|| {
                KernelError::unresolved_field(format!("Instance has no nested field '{name}'"))
            })
    }

    /// Shorthand for a required text field.
    pub fn text(&self, name: &str) -> KernelResult<&str> {
        self.scalar(name)?.as_str().ok_or_else(|| {
            KernelError::unresolved_field(format!("Field '{name}' is not text"))
        })
    }

    /// Iterate over `(field, value)` pairs in shape order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// A typed projection target: supplies its shape as a type token and
/// converts materialized instances into itself.
///
/// This is how the same base query is rendered into a dynamically chosen
/// output shape at call time without a new query definition per shape.
pub trait FromShape: Sized {
    /// The shape this type projects.
    fn shape() -> ProjectionShape;

    /// Convert a materialized instance into this type.
    fn from_instance(instance: &ShapeInstance) -> KernelResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_row() -> Row {
        let mut row = Row::new();
        row.push("username", "member1");
        row.push("age", 10i64);
        row
    }

    #[test]
    fn concat_expression_renders_columns_and_literals() {
        let expr = ProjectionExpr::concat(vec![
            ProjectionTerm::Column("username".into()),
            ProjectionTerm::Literal(" ".into()),
            ProjectionTerm::Column("age".into()),
        ]);
        assert_eq!(
            expr.eval(&member_row()).unwrap(),
            Value::Text("member1 10".into())
        );
    }

    #[test]
    fn missing_expression_column_is_unresolved() {
        let expr = ProjectionExpr::concat(vec![ProjectionTerm::Column("nickname".into())]);
        let err = expr.eval(&member_row()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnresolvedProjectionField);
    }

    #[test]
    fn closed_shape_exposes_source_columns() {
        let shape = ProjectionShape::new(vec![ProjectionField::column("username")]);
        assert!(shape.is_closed());
        assert_eq!(shape.source_columns(), Some(vec!["username"]));
    }

    #[test]
    fn open_shape_is_not_closed() {
        let shape = ProjectionShape::new(vec![
            ProjectionField::column("username"),
            ProjectionField::expression(
                "label",
                ProjectionExpr::concat(vec![ProjectionTerm::Column("age".into())]),
            ),
        ]);
        assert!(!shape.is_closed());
        assert_eq!(shape.source_columns(), None);
    }
}
