//! `StoreSession` implementation for the memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use roster_core::traits::StoreSession;
use roster_core::types::{LockMode, Row, Statement};
use roster_core::{KernelError, KernelResult};

use super::engine::{LockKey, Shared};

/// One rollback step, applied in reverse order.
#[derive(Debug)]
enum UndoOp {
    /// Undo an insert.
    Remove { table: String, id: i64 },
    /// Undo an update or delete.
    Restore { table: String, id: i64, prior: Row },
}

#[derive(Debug, Default)]
struct TxState {
    undo: Vec<UndoOp>,
    locks: Vec<LockKey>,
}

/// A session over the in-memory engine.
///
/// Owned by exactly one unit of work. Dropping the session with an open
/// transaction rolls it back and releases its row locks.
#[derive(Debug)]
pub struct MemorySession {
    shared: Arc<Shared>,
    id: Uuid,
    tx: Option<TxState>,
}

impl MemorySession {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            id: Uuid::new_v4(),
            tx: None,
        }
    }

    /// Acquire write locks on the given rows. Inside a transaction the
    /// locks are held until commit/rollback; otherwise they last only for
    /// the statement and must be released by the caller.
    async fn lock_rows(&mut self, table: &str, ids: &[i64]) -> Vec<LockKey> {
        let mut keys = Vec::with_capacity(ids.len());
        for id in ids {
            let key = (table.to_string(), *id);
            self.shared.acquire_lock(key.clone(), self.id).await;
            keys.push(key);
        }
        match &mut self.tx {
            Some(tx) => {
                tx.locks.extend(keys);
                Vec::new()
            }
            None => keys,
        }
    }

    fn rollback_sync(&mut self) {
        if let Some(mut tx) = self.tx.take() {
            while let Some(op) = tx.undo.pop() {
                match op {
                    UndoOp::Remove { table, id } => self.shared.remove_row(&table, id),
                    UndoOp::Restore { table, id, prior } => {
                        self.shared.restore_row(&table, id, prior)
                    }
                }
            }
            self.shared.release_locks(self.id, &tx.locks);
        }
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn execute(&mut self, statement: &Statement) -> KernelResult<Vec<Row>> {
        self.shared.log.record(statement);
        match statement {
            Statement::Select(select) => {
                let mut rows = self.shared.eval_select(select);
                if select.lock == LockMode::PessimisticWrite {
                    let ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
                    let statement_locks = self.lock_rows(&select.table, &ids).await;
                    // Re-read under lock; a prior holder may have written.
                    rows = self.shared.rows_by_ids(&select.table, &ids);
                    self.shared.release_locks(self.id, &statement_locks);
                }
                self.shared.project(select, rows)
            }
            Statement::Insert(insert) => {
                let (id, row) = self.shared.insert(insert)?;
                if let Some(tx) = &mut self.tx {
                    tx.undo.push(UndoOp::Remove {
                        table: insert.table.clone(),
                        id,
                    });
                }
                Ok(vec![row])
            }
            other => Err(KernelError::store(format!(
                "Statement kind '{}' does not return rows",
                other.kind()
            ))),
        }
    }

    async fn execute_scalar(&mut self, statement: &Statement) -> KernelResult<i64> {
        self.shared.log.record(statement);
        match statement {
            Statement::Count(count) => Ok(self.shared.count(count)),
            other => Err(KernelError::store(format!(
                "Statement kind '{}' is not scalar",
                other.kind()
            ))),
        }
    }

    async fn execute_update(&mut self, statement: &Statement) -> KernelResult<u64> {
        self.shared.log.record(statement);
        match statement {
            Statement::Update(update) => {
                let ids = self.shared.matching_ids(&update.table, &update.filter);
                let statement_locks = self.lock_rows(&update.table, &ids).await;
                let mut affected = 0u64;
                for id in ids {
                    if let Some(prior) = self.shared.apply_update(update, id)? {
                        affected += 1;
                        if let Some(tx) = &mut self.tx {
                            tx.undo.push(UndoOp::Restore {
                                table: update.table.clone(),
                                id,
                                prior,
                            });
                        }
                    }
                }
                self.shared.release_locks(self.id, &statement_locks);
                Ok(affected)
            }
            Statement::Delete(delete) => {
                let ids = self.shared.matching_ids(&delete.table, &delete.filter);
                let statement_locks = self.lock_rows(&delete.table, &ids).await;
                let mut affected = 0u64;
                for id in ids {
                    if let Some(prior) = self.shared.apply_delete(&delete.table, &delete.filter, id)
                    {
                        affected += 1;
                        if let Some(tx) = &mut self.tx {
                            tx.undo.push(UndoOp::Restore {
                                table: delete.table.clone(),
                                id,
                                prior,
                            });
                        }
                    }
                }
                self.shared.release_locks(self.id, &statement_locks);
                Ok(affected)
            }
            other => Err(KernelError::store(format!(
                "Statement kind '{}' is not an update",
                other.kind()
            ))),
        }
    }

    async fn begin(&mut self) -> KernelResult<()> {
        if self.tx.is_some() {
            return Err(KernelError::store("Transaction already active"));
        }
        debug!(session = %self.id, "begin transaction");
        self.tx = Some(TxState::default());
        Ok(())
    }

    async fn commit(&mut self) -> KernelResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| KernelError::store("No transaction to commit"))?;
        self.shared.release_locks(self.id, &tx.locks);
        debug!(session = %self.id, "commit transaction");
        Ok(())
    }

    async fn rollback(&mut self) -> KernelResult<()> {
        if self.tx.is_none() {
            return Err(KernelError::store("No transaction to roll back"));
        }
        debug!(session = %self.id, "rollback transaction");
        self.rollback_sync();
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        // A session dropped mid-transaction rolls back.
        self.rollback_sync();
    }
}

#[cfg(test)]
mod tests {
    use roster_core::traits::{Store, StoreSession};
    use roster_core::types::{
        FilterField, InsertStatement, Row, SelectStatement, Statement, Value,
    };

    use crate::memory::MemoryStore;

    fn member_row(username: &str, age: i64) -> Row {
        let mut row = Row::new();
        row.push("id", Value::Null);
        row.push("username", username);
        row.push("age", age);
        row
    }

    fn insert(username: &str, age: i64) -> Statement {
        Statement::Insert(InsertStatement {
            table: "member".into(),
            row: member_row(username, age),
        })
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();

        let first = session.execute(&insert("member1", 10)).await.unwrap();
        let second = session.execute(&insert("member2", 20)).await.unwrap();

        assert_eq!(first[0].get("id").unwrap().as_i64(), Some(1));
        assert_eq!(second[0].get("id").unwrap().as_i64(), Some(2));
    }

    #[tokio::test]
    async fn rollback_restores_rows() {
        let store = MemoryStore::new();
        let mut session = store.session().await.unwrap();
        session.execute(&insert("member1", 10)).await.unwrap();

        session.begin().await.unwrap();
        session.execute(&insert("member2", 20)).await.unwrap();
        session
            .execute_update(&Statement::Update(roster_core::types::UpdateStatement {
                table: "member".into(),
                assignments: vec![roster_core::types::Assignment::set("age", 99i64)],
                filter: FilterField::eq("username", "member1").into(),
            }))
            .await
            .unwrap();
        session.rollback().await.unwrap();

        let rows = session
            .execute(&Statement::Select(SelectStatement::all("member")))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("age").unwrap().as_i64(), Some(10));
    }
}
