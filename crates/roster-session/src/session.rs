//! The unit of work: identity map, dirty tracking, and flush ordering.

use std::collections::HashMap;

use tracing::debug;

use roster_core::traits::StoreSession;
use roster_core::types::{
    Assignment, CountStatement, DeleteStatement, FilterField, InsertStatement, Row,
    SelectStatement, Statement, UpdateStatement, Value,
};
use roster_core::{KernelError, KernelResult};
use roster_entity::{Record, Relation};

use crate::executor::Executor;
use crate::mapper;

type EntityKey = (&'static str, i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// In sync with the store.
    Clean,
    /// Mutated since load; diffed against the snapshot at flush.
    Dirty,
    /// Attached with an identity but no as-loaded snapshot; flushed as a
    /// full-column, version-checked update.
    Merge,
}

#[derive(Debug, Clone)]
struct CachedEntry {
    current: Row,
    snapshot: Option<Row>,
    state: EntryState,
}

/// One unit of work: a session-scoped identity map over an exclusive
/// store session.
///
/// The identity map is owned by this unit of work alone and is never
/// shared across concurrent transactions. Flush ordering invariant: every
/// read issued through the session first applies outstanding object-level
/// writes to the store — except bulk statements, which skip this ordering
/// and do not observe unflushed in-memory changes (see
/// [`crate::concurrency::bulk_update`]).
#[derive(Debug)]
pub struct Session<S: StoreSession> {
    executor: Executor<S>,
    identity: HashMap<EntityKey, CachedEntry>,
    dirty_queue: Vec<EntityKey>,
    actor: Option<String>,
}

impl<S: StoreSession> Session<S> {
    /// Open a unit of work over a store session.
    pub fn new(store: S) -> Self {
        Self {
            executor: Executor::new(store),
            identity: HashMap::new(),
            dirty_queue: Vec::new(),
            actor: None,
        }
    }

    /// Attach an actor name stamped into `created_by`/`updated_by`.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// The actor stamped into audit fields, if any.
    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub(crate) fn executor_mut(&mut self) -> &mut Executor<S> {
        &mut self.executor
    }

    /// How many times a statement with this cache key has executed in
    /// this unit of work.
    pub fn statement_executions(&self, statement: &Statement) -> u64 {
        self.executor.statement_executions(statement)
    }

    /// Save a record.
    ///
    /// A record without an identity is inserted immediately (the insert
    /// hook stamps its audit block and the store assigns its id). A
    /// record with an identity marks the cached entry dirty; the update
    /// itself is deferred and diffed at flush. Saving an identified
    /// record this session never loaded attaches it for a full-column,
    /// version-checked update.
    pub async fn save<R: Record>(&mut self, record: &mut R) -> KernelResult<()> {
        match record.id() {
            None => self.insert(record).await,
            Some(id) => {
                self.mark_dirty(record, id);
                Ok(())
            }
        }
    }

    async fn insert<R: Record>(&mut self, record: &mut R) -> KernelResult<()> {
        mapper::before_insert(record, self.actor.as_deref());
        let statement = Statement::Insert(InsertStatement {
            table: R::table().to_string(),
            row: record.to_row(),
        });
        let rows = self.executor.execute(&statement).await?;
        let id = rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| KernelError::store("Insert did not return an id"))?;
        record.set_id(id);

        let row = record.to_row();
        self.identity.insert(
            (R::table(), id),
            CachedEntry {
                current: row.clone(),
                snapshot: Some(row),
                state: EntryState::Clean,
            },
        );
        Ok(())
    }

    fn mark_dirty<R: Record>(&mut self, record: &mut R, id: i64) {
        let key = (R::table(), id);
        let cached = self.identity.contains_key(&key);

        if cached {
            // The cached entry owns the version stamp; a caller holding a
            // copy from before an earlier flush would otherwise regress it.
            let entry_version = self
                .identity
                .get(&key)
                .and_then(|entry| entry.current.get("version"))
                .and_then(Value::as_i64);
            if let Some(version) = entry_version {
                record.set_version(version);
            }
            // No intervening mutation: the update hook is not re-run and
            // nothing is queued.
            let unchanged = self
                .identity
                .get(&key)
                .is_some_and(|entry| same_ignoring_update_stamp(&record.to_row(), &entry.current));
            if unchanged {
                return;
            }
            mapper::before_update(record, self.actor.as_deref());
            let entry = self.identity.get_mut(&key).expect("entry checked above");
            entry.current = record.to_row();
            if entry.state == EntryState::Clean {
                entry.state = EntryState::Dirty;
                self.dirty_queue.push(key);
            }
        } else {
            mapper::before_update(record, self.actor.as_deref());
            self.identity.insert(
                key,
                CachedEntry {
                    current: record.to_row(),
                    snapshot: None,
                    state: EntryState::Merge,
                },
            );
            self.dirty_queue.push(key);
        }
    }

    /// Find a record by identity. An identity-map hit returns the cached
    /// state without issuing a statement.
    pub async fn find_by_id<R: Record>(&mut self, id: i64) -> KernelResult<Option<R>> {
        let key = (R::table(), id);
        if let Some(entry) = self.identity.get(&key) {
            return Ok(Some(mapper::row_to_record(&entry.current)?));
        }

        self.flush().await?;
        let statement = Statement::Select(
            SelectStatement::all(R::table())
                .filter(FilterField::eq("id", id).into())
                .limit(1),
        );
        let rows = self.executor.execute(&statement).await?;
        match rows.into_iter().next() {
            Some(row) => {
                let record: R = mapper::row_to_record(&row)?;
                self.identity.insert(
                    key,
                    CachedEntry {
                        current: row.clone(),
                        snapshot: Some(row),
                        state: EntryState::Clean,
                    },
                );
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Find a record by identity, failing with `NotFound` on a miss.
    pub async fn get<R: Record>(&mut self, id: i64) -> KernelResult<R> {
        self.find_by_id(id).await?.ok_or_else(|| {
            KernelError::not_found(format!("No {} with id {id}", R::table()))
        })
    }

    /// Run a full-row select and map the results into records.
    ///
    /// Pending writes are flushed first. Rows already present in the
    /// identity map are served from their cached state (repeatable read
    /// within the unit of work).
    pub async fn query<R: Record>(&mut self, select: SelectStatement) -> KernelResult<Vec<R>> {
        self.flush().await?;
        let statement = Statement::Select(select);
        let rows = self.executor.execute(&statement).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.require("id")?.as_i64().ok_or_else(|| {
                KernelError::schema_mismatch("Row id column is not an integer")
            })?;
            let key = (R::table(), id);
            match self.identity.get(&key) {
                Some(entry) => records.push(mapper::row_to_record(&entry.current)?),
                None => {
                    let record: R = mapper::row_to_record(&row)?;
                    self.identity.insert(
                        key,
                        CachedEntry {
                            current: row.clone(),
                            snapshot: Some(row),
                            state: EntryState::Clean,
                        },
                    );
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Run a select and return raw rows, bypassing the identity map.
    /// Pending writes are flushed first. Used by projections.
    pub async fn query_rows(&mut self, select: SelectStatement) -> KernelResult<Vec<Row>> {
        self.flush().await?;
        self.executor.execute(&Statement::Select(select)).await
    }

    /// Run a counting query. Pending writes are flushed first.
    pub async fn count(&mut self, count: CountStatement) -> KernelResult<i64> {
        self.flush().await?;
        self.executor.execute_scalar(&Statement::Count(count)).await
    }

    /// Apply outstanding object-level writes to the store.
    ///
    /// Dirty entries are diffed against their as-loaded snapshot and
    /// flushed as column-wise updates; merge entries are flushed with
    /// every column. Both carry a version predicate — zero affected rows
    /// surfaces `StaleData` and the remaining queue is abandoned.
    pub async fn flush(&mut self) -> KernelResult<()> {
        for key in std::mem::take(&mut self.dirty_queue) {
            let Some(entry) = self.identity.get(&key) else {
                continue;
            };
            let (assignments, old_version) = match entry.state {
                EntryState::Clean => continue,
                EntryState::Dirty => {
                    let snapshot = entry.snapshot.as_ref().expect("dirty entry has snapshot");
                    let old_version = snapshot
                        .get("version")
                        .and_then(Value::as_i64)
                        .unwrap_or_default();
                    let changed: Vec<Assignment> = entry
                        .current
                        .iter()
                        .filter(|(column, value)| {
                            updatable(column) && snapshot.get(column) != Some(value)
                        })
                        .map(|(column, value)| Assignment::set(column, value.clone()))
                        .collect();
                    if changed.is_empty() {
                        let entry = self.identity.get_mut(&key).expect("entry present");
                        entry.state = EntryState::Clean;
                        continue;
                    }
                    (changed, old_version)
                }
                EntryState::Merge => {
                    let assignments: Vec<Assignment> = entry
                        .current
                        .iter()
                        .filter(|(column, _)| updatable(column))
                        .map(|(column, value)| Assignment::set(column, value.clone()))
                        .collect();
                    let old_version = entry
                        .current
                        .get("version")
                        .and_then(Value::as_i64)
                        .unwrap_or_default();
                    (assignments, old_version)
                }
            };

            let (table, id) = key;
            let mut assignments = assignments;
            assignments.push(Assignment::set("version", old_version + 1));
            let statement = Statement::Update(UpdateStatement {
                table: table.to_string(),
                assignments,
                filter: roster_core::types::Filter::of(vec![
                    FilterField::eq("id", id),
                    FilterField::eq("version", old_version),
                ]),
            });
            let affected = self.executor.execute_update(&statement).await?;
            if affected == 0 {
                return Err(KernelError::stale_data(format!(
                    "{table} id {id} was modified concurrently (expected version {old_version})"
                )));
            }
            debug!(table, id, version = old_version + 1, "flushed update");

            let entry = self.identity.get_mut(&key).expect("entry present");
            entry.current.set("version", old_version + 1);
            entry.snapshot = Some(entry.current.clone());
            entry.state = EntryState::Clean;
        }
        Ok(())
    }

    /// Delete a record. The delete carries a version predicate; zero
    /// affected rows surfaces `StaleData`.
    pub async fn delete<R: Record>(&mut self, record: &R) -> KernelResult<()> {
        let id = record.id().ok_or_else(|| {
            KernelError::not_found(format!(
                "Cannot delete a transient {} (no identity)",
                R::table()
            ))
        })?;
        let key = (R::table(), id);
        // Prefer the cached entry's version: it reflects flushes the
        // caller's copy may predate.
        let version = self
            .identity
            .remove(&key)
            .and_then(|entry| entry.current.get("version").and_then(Value::as_i64))
            .unwrap_or_else(|| record.version());
        self.dirty_queue.retain(|queued| *queued != key);

        let statement = Statement::Delete(DeleteStatement {
            table: R::table().to_string(),
            filter: roster_core::types::Filter::of(vec![
                FilterField::eq("id", id),
                FilterField::eq("version", version),
            ]),
        });
        let affected = self.executor.execute_update(&statement).await?;
        if affected == 0 {
            return Err(KernelError::stale_data(format!(
                "{} id {id} was deleted or modified concurrently",
                R::table()
            )));
        }
        Ok(())
    }

    /// Resolve a relation within this session, loading the target on
    /// first access.
    pub async fn resolve<'a, R: Record>(
        &mut self,
        relation: &'a mut Relation<R>,
    ) -> KernelResult<&'a R> {
        if let Relation::Unloaded(id) = relation {
            let record = self.get::<R>(*id).await?;
            *relation = Relation::loaded(record);
        }
        relation.get()
    }

    /// Evict every cached entry and drop pending dirty state.
    pub fn clear(&mut self) {
        self.identity.clear();
        self.dirty_queue.clear();
    }

    /// Evict one cached entry.
    pub fn evict<R: Record>(&mut self, id: i64) {
        let key = (R::table(), id);
        self.identity.remove(&key);
        self.dirty_queue.retain(|queued| *queued != key);
    }

    /// Whether a record is currently cached in the identity map.
    pub fn is_cached<R: Record>(&self, id: i64) -> bool {
        self.identity.contains_key(&(R::table(), id))
    }

    /// Begin an explicit transaction.
    pub async fn begin(&mut self) -> KernelResult<()> {
        self.executor.begin().await
    }

    /// Flush pending writes and commit the active transaction.
    pub async fn commit(&mut self) -> KernelResult<()> {
        self.flush().await?;
        self.executor.commit().await
    }

    /// Roll back the active transaction and clear the identity map,
    /// whose cached state no longer reflects the store.
    pub async fn rollback(&mut self) -> KernelResult<()> {
        self.executor.rollback().await?;
        self.clear();
        Ok(())
    }

    /// Whether an explicit transaction is active.
    pub fn in_transaction(&self) -> bool {
        self.executor.in_transaction()
    }
}

/// Whether two rows are equal apart from the update stamp the hook would
/// rewrite.
fn same_ignoring_update_stamp(a: &Row, b: &Row) -> bool {
    a.iter()
        .filter(|(column, _)| *column != "updated_at" && *column != "updated_by")
        .all(|(column, value)| b.get(column) == Some(value))
}

/// Columns updates may write. Identity and version are owned by the
/// flush itself; the created-audit pair is write-once at insert.
fn updatable(column: &str) -> bool {
    !matches!(column, "id" | "version" | "created_at" | "created_by")
}
