//! Structured statements interpreted by store backends.
//!
//! Queries are described as data, never parsed from SQL text. A backend
//! either interprets the description directly (memory engine) or renders
//! it to parameterized SQL (PostgreSQL).

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::types::filter::Filter;
use crate::types::row::Row;
use crate::types::sorting::SortField;
use crate::types::value::Value;

/// The set of columns a select statement materializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnSet {
    /// Every column of the target table.
    All,
    /// Only the named columns, in order.
    Only(Vec<String>),
}

/// Lock mode attached to a select statement.
///
/// A lock token has no persisted representation; it exists only for the
/// duration of the originating transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// No locking.
    #[default]
    None,
    /// Acquire a write lock on the selected rows for the duration of the
    /// active transaction.
    PessimisticWrite,
}

/// A row-returning select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    /// Target table.
    pub table: String,
    /// Columns to materialize.
    pub columns: ColumnSet,
    /// Row filter (conjunction).
    pub filter: Filter,
    /// Ordering; ties beyond these fields follow natural storage order.
    pub sort: Vec<SortField>,
    /// First-result offset.
    pub offset: Option<u64>,
    /// Max-result limit.
    pub limit: Option<u64>,
    /// Attached lock mode.
    pub lock: LockMode,
}

impl SelectStatement {
    /// A full-row select over a table with no filter or ordering.
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: ColumnSet::All,
            filter: Filter::none(),
            sort: Vec::new(),
            offset: None,
            limit: None,
            lock: LockMode::None,
        }
    }

    /// Replace the filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Replace the column set with a named projection.
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = ColumnSet::Only(columns);
        self
    }

    /// Replace the ordering.
    pub fn sort(mut self, sort: Vec<SortField>) -> Self {
        self.sort = sort;
        self
    }

    /// Set offset and limit.
    pub fn range(mut self, offset: u64, limit: u64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    /// Set only the limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Attach a lock mode.
    pub fn lock(mut self, lock: LockMode) -> Self {
        self.lock = lock;
        self
    }
}

/// A scalar row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountStatement {
    /// Target table.
    pub table: String,
    /// Row filter (conjunction).
    pub filter: Filter,
}

impl CountStatement {
    /// Count rows matching a filter.
    pub fn new(table: impl Into<String>, filter: Filter) -> Self {
        Self {
            table: table.into(),
            filter,
        }
    }
}

/// A single-row insert. A `Null` id cell asks the store to assign the
/// identity; the returned row carries the assigned `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    /// Target table.
    pub table: String,
    /// The row to insert.
    pub row: Row,
}

/// An assignment applied by an update statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Target column.
    pub column: String,
    /// Operation to apply.
    pub op: AssignOp,
}

/// Update assignment operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignOp {
    /// Set the column to a value.
    Set(Value),
    /// Increment the column by a signed amount.
    Increment(i64),
}

impl Assignment {
    /// Set a column to a value.
    pub fn set(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: AssignOp::Set(value.into()),
        }
    }

    /// Increment a column by a signed amount.
    pub fn increment(column: impl Into<String>, by: i64) -> Self {
        Self {
            column: column.into(),
            op: AssignOp::Increment(by),
        }
    }
}

/// A filtered update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    /// Target table.
    pub table: String,
    /// Assignments to apply to every matching row.
    pub assignments: Vec<Assignment>,
    /// Row filter (conjunction).
    pub filter: Filter,
}

/// A filtered delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    /// Target table.
    pub table: String,
    /// Row filter (conjunction).
    pub filter: Filter,
}

/// A parameterized statement executed by a store session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Row-returning select.
    Select(SelectStatement),
    /// Scalar row count.
    Count(CountStatement),
    /// Single-row insert.
    Insert(InsertStatement),
    /// Filtered update.
    Update(UpdateStatement),
    /// Filtered delete.
    Delete(DeleteStatement),
}

impl Statement {
    /// A short kind label, for logs and instrumentation counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::Count(_) => "count",
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }

    /// A canonical cache key for this statement's prepared form.
    ///
    /// The key covers the statement's structure — table, projected column
    /// set, filter fields and operators, ordering, range flags, and lock
    /// mode — but not parameter values. Two selects over the same table
    /// with different projected columns therefore get distinct keys.
    pub fn cache_key(&self) -> String {
        let mut key = String::new();
        match self {
            Self::Select(select) => {
                write!(key, "select:{}", select.table).unwrap();
                match &select.columns {
                    ColumnSet::All => key.push_str(":*"),
                    ColumnSet::Only(columns) => {
                        write!(key, ":{}", columns.join(",")).unwrap();
                    }
                }
                write_filter_key(&mut key, &select.filter);
                for sort in &select.sort {
                    write!(key, ":ord={}.{}", sort.field, sort.direction.as_sql()).unwrap();
                }
                if select.offset.is_some() {
                    key.push_str(":offset");
                }
                if select.limit.is_some() {
                    key.push_str(":limit");
                }
                if select.lock == LockMode::PessimisticWrite {
                    key.push_str(":for-update");
                }
            }
            Self::Count(count) => {
                write!(key, "count:{}", count.table).unwrap();
                write_filter_key(&mut key, &count.filter);
            }
            Self::Insert(insert) => {
                write!(key, "insert:{}", insert.table).unwrap();
                for (column, _) in insert.row.iter() {
                    write!(key, ":{column}").unwrap();
                }
            }
            Self::Update(update) => {
                write!(key, "update:{}", update.table).unwrap();
                for assignment in &update.assignments {
                    let op = match assignment.op {
                        AssignOp::Set(_) => "set",
                        AssignOp::Increment(_) => "incr",
                    };
                    write!(key, ":{}={op}", assignment.column).unwrap();
                }
                write_filter_key(&mut key, &update.filter);
            }
            Self::Delete(delete) => {
                write!(key, "delete:{}", delete.table).unwrap();
                write_filter_key(&mut key, &delete.filter);
            }
        }
        key
    }
}

fn write_filter_key(key: &mut String, filter: &Filter) {
    for condition in &filter.conditions {
        write!(key, ":{}{:?}", condition.field, condition.op).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::filter::FilterField;

    #[test]
    fn cache_key_includes_column_set() {
        let full = Statement::Select(SelectStatement::all("member"));
        let narrowed = Statement::Select(
            SelectStatement::all("member").columns(vec!["username".to_string()]),
        );
        assert_ne!(full.cache_key(), narrowed.cache_key());
    }

    #[test]
    fn cache_key_ignores_parameter_values() {
        let a = Statement::Select(
            SelectStatement::all("member").filter(FilterField::eq("username", "member1").into()),
        );
        let b = Statement::Select(
            SelectStatement::all("member").filter(FilterField::eq("username", "member2").into()),
        );
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
