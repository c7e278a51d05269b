//! The query executor: statement execution over a store session.

use std::collections::HashMap;

use roster_core::KernelResult;
use roster_core::traits::StoreSession;
use roster_core::types::{Row, Statement};

/// Tracks prepared-statement reuse, keyed by the statement's canonical
/// cache key. The projected column set is part of the key, so a closed
/// projection over different columns never shares an entry.
#[derive(Debug, Default)]
pub(crate) struct StatementCache {
    executions: HashMap<String, u64>,
}

impl StatementCache {
    fn observe(&mut self, statement: &Statement) {
        *self.executions.entry(statement.cache_key()).or_insert(0) += 1;
    }

    fn executions(&self, statement: &Statement) -> u64 {
        self.executions
            .get(&statement.cache_key())
            .copied()
            .unwrap_or(0)
    }
}

/// Runs parameterized statements against a store session and returns raw
/// rows and scalar results.
///
/// The executor does not order writes against reads itself; the owning
/// session enforces the flush ordering invariant before issuing reads.
#[derive(Debug)]
pub struct Executor<S: StoreSession> {
    store: S,
    cache: StatementCache,
}

impl<S: StoreSession> Executor<S> {
    /// Wrap a store session.
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: StatementCache::default(),
        }
    }

    /// Execute a row-returning statement.
    pub async fn execute(&mut self, statement: &Statement) -> KernelResult<Vec<Row>> {
        self.cache.observe(statement);
        self.store.execute(statement).await
    }

    /// Execute a scalar statement (a count).
    pub async fn execute_scalar(&mut self, statement: &Statement) -> KernelResult<i64> {
        self.cache.observe(statement);
        self.store.execute_scalar(statement).await
    }

    /// Execute an update or delete, returning the affected row count.
    pub async fn execute_update(&mut self, statement: &Statement) -> KernelResult<u64> {
        self.cache.observe(statement);
        self.store.execute_update(statement).await
    }

    /// How many times a statement with this cache key has executed on
    /// this executor. Anything past the first execution reuses the
    /// prepared form.
    pub fn statement_executions(&self, statement: &Statement) -> u64 {
        self.cache.executions(statement)
    }

    /// Begin an explicit transaction on the underlying session.
    pub async fn begin(&mut self) -> KernelResult<()> {
        self.store.begin().await
    }

    /// Commit the active transaction.
    pub async fn commit(&mut self) -> KernelResult<()> {
        self.store.commit().await
    }

    /// Roll back the active transaction.
    pub async fn rollback(&mut self) -> KernelResult<()> {
        self.store.rollback().await
    }

    /// Whether an explicit transaction is active.
    pub fn in_transaction(&self) -> bool {
        self.store.in_transaction()
    }
}
