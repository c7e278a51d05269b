//! Core type definitions used across the Roster workspace.

pub mod filter;
pub mod pagination;
pub mod projection;
pub mod row;
pub mod sorting;
pub mod statement;
pub mod value;

pub use filter::{Filter, FilterField, FilterOp};
pub use pagination::{Page, PageRequest, Slice};
pub use projection::{
    FieldKind, FieldValue, FromShape, ProjectionExpr, ProjectionField, ProjectionShape,
    ProjectionTerm, ShapeInstance,
};
pub use row::Row;
pub use sorting::{SortDirection, SortField};
pub use statement::{
    AssignOp, Assignment, ColumnSet, CountStatement, DeleteStatement, InsertStatement, LockMode,
    SelectStatement, Statement, UpdateStatement,
};
pub use value::Value;
