//! The store seam: transactional sessions over a relational backend.

use async_trait::async_trait;

use crate::result::KernelResult;
use crate::types::row::Row;
use crate::types::statement::Statement;

/// A transactional session against a relational store.
///
/// Each session belongs to exactly one unit of work and must never be
/// shared across concurrent transactions. Every call may block on I/O to
/// the backing store; dropping an in-flight future cancels the underlying
/// I/O and discards partial results.
///
/// Transactions are explicit. Pessimistic row locks acquired inside a
/// transaction are held by the store, not the kernel, and are released at
/// transaction end on every exit path — including a session dropped
/// without `commit`, which rolls back.
#[async_trait]
pub trait StoreSession: Send {
    /// Execute a row-returning statement. For inserts, the returned row
    /// carries the store-assigned `id`.
    async fn execute(&mut self, statement: &Statement) -> KernelResult<Vec<Row>>;

    /// Execute a scalar statement (a count) and return its value.
    async fn execute_scalar(&mut self, statement: &Statement) -> KernelResult<i64>;

    /// Execute an update or delete and return the affected row count.
    async fn execute_update(&mut self, statement: &Statement) -> KernelResult<u64>;

    /// Begin an explicit transaction.
    async fn begin(&mut self) -> KernelResult<()>;

    /// Commit the active transaction, releasing any row locks.
    async fn commit(&mut self) -> KernelResult<()>;

    /// Roll back the active transaction, restoring pre-transaction row
    /// state and releasing any row locks.
    async fn rollback(&mut self) -> KernelResult<()>;

    /// Whether an explicit transaction is active on this session.
    fn in_transaction(&self) -> bool;
}

/// A handle to a relational store that can open sessions.
///
/// The store itself is safe to share across concurrent units of work; the
/// sessions it opens are not.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// The session type this store opens.
    type Session: StoreSession + 'static;

    /// Open a new session.
    async fn session(&self) -> KernelResult<Self::Session>;
}
