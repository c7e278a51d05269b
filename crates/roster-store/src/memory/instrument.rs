//! Query instrumentation for the memory backend.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use roster_core::types::Statement;

use crate::statement::render;

#[derive(Debug, Default)]
struct LogInner {
    statements: Mutex<Vec<String>>,
    selects: AtomicU64,
    counts: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

/// A cloneable handle to the store's statement log.
///
/// Records the rendered SQL text of every executed statement plus
/// per-kind counters. Shared by all sessions of one [`super::MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    inner: Arc<LogInner>,
}

impl QueryLog {
    /// Record an executed statement.
    pub(crate) fn record(&self, statement: &Statement) {
        let (sql, _) = render(statement);
        self.inner.statements.lock().unwrap().push(sql);
        let counter = match statement {
            Statement::Select(_) => &self.inner.selects,
            Statement::Count(_) => &self.inner.counts,
            Statement::Insert(_) => &self.inner.inserts,
            Statement::Update(_) => &self.inner.updates,
            Statement::Delete(_) => &self.inner.deletes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// The rendered SQL of every statement executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.inner.statements.lock().unwrap().clone()
    }

    /// The most recently executed statement, if any.
    pub fn last_statement(&self) -> Option<String> {
        self.inner.statements.lock().unwrap().last().cloned()
    }

    /// Number of row-returning selects executed.
    pub fn select_queries(&self) -> u64 {
        self.inner.selects.load(Ordering::Relaxed)
    }

    /// Number of counting queries executed.
    pub fn count_queries(&self) -> u64 {
        self.inner.counts.load(Ordering::Relaxed)
    }

    /// Number of inserts executed.
    pub fn insert_statements(&self) -> u64 {
        self.inner.inserts.load(Ordering::Relaxed)
    }

    /// Number of updates executed.
    pub fn update_statements(&self) -> u64 {
        self.inner.updates.load(Ordering::Relaxed)
    }

    /// Number of deletes executed.
    pub fn delete_statements(&self) -> u64 {
        self.inner.deletes.load(Ordering::Relaxed)
    }

    /// Clear the log and counters.
    pub fn reset(&self) {
        self.inner.statements.lock().unwrap().clear();
        self.inner.selects.store(0, Ordering::Relaxed);
        self.inner.counts.store(0, Ordering::Relaxed);
        self.inner.inserts.store(0, Ordering::Relaxed);
        self.inner.updates.store(0, Ordering::Relaxed);
        self.inner.deletes.store(0, Ordering::Relaxed);
    }
}
