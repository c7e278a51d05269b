//! The `Record` trait implemented by every persisted entity.

use roster_core::KernelResult;
use roster_core::types::Row;

use crate::audit::AuditBlock;

/// Metadata for a to-one relation from one record type to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation name, as referenced by nested projection shapes.
    pub name: &'static str,
    /// The foreign-key column on the owning table.
    pub column: &'static str,
    /// The related record's table.
    pub target_table: &'static str,
}

/// A typed, identity-bearing domain entity persisted in the store.
///
/// Identity is store-assigned on insert (`id` is `None` until then). The
/// `version` stamp backs optimistic concurrency: flushed updates and
/// deletes carry a version predicate and fail with `StaleData` when it no
/// longer matches.
pub trait Record: Clone + Send + Sync + 'static {
    /// The backing table name.
    fn table() -> &'static str;

    /// Every column of the backing table, in statement order.
    fn columns() -> &'static [&'static str];

    /// To-one relations declared by this record.
    fn relations() -> &'static [RelationDef] {
        &[]
    }

    /// The store-assigned identity, if the record has been inserted.
    fn id(&self) -> Option<i64>;

    /// Set the store-assigned identity.
    fn set_id(&mut self, id: i64);

    /// The optimistic concurrency version stamp.
    fn version(&self) -> i64;

    /// Set the version stamp.
    fn set_version(&mut self, version: i64);

    /// The embedded audit block.
    fn audit(&self) -> &AuditBlock;

    /// Mutable access to the embedded audit block (mapper hooks only).
    fn audit_mut(&mut self) -> &mut AuditBlock;

    /// Convert this record into a full row.
    fn to_row(&self) -> Row;

    /// Build a record from a full row, failing with `SchemaMismatch` when
    /// a required column is absent.
    fn from_row(row: &Row) -> KernelResult<Self>;
}
