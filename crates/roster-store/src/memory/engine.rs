//! The shared in-memory table engine.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;
use uuid::Uuid;

use roster_core::traits::Store;
use roster_core::types::{
    AssignOp, ColumnSet, CountStatement, Filter, FilterOp, InsertStatement, Row,
    SelectStatement, SortField, UpdateStatement, Value,
};
use roster_core::{KernelError, KernelResult};

use super::instrument::QueryLog;
use super::session::MemorySession;

/// Identifies one lockable row.
pub(crate) type LockKey = (String, i64);

#[derive(Debug)]
pub(crate) struct Table {
    pub rows: BTreeMap<i64, Row>,
    next_id: i64,
}

impl Table {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn assign_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// State shared by every session of one [`MemoryStore`].
#[derive(Debug, Default)]
pub(crate) struct Shared {
    tables: DashMap<String, Table>,
    locks: DashMap<LockKey, Uuid>,
    lock_released: Notify,
    pub(crate) log: QueryLog,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    /// Evaluate a select: filter, sort, and range, returning full stored
    /// rows keyed by id. Column projection happens separately so lock
    /// acquisition can re-read rows by id.
    pub(crate) fn eval_select(&self, select: &SelectStatement) -> Vec<(i64, Row)> {
        let mut rows: Vec<(i64, Row)> = match self.tables.get(&select.table) {
            Some(table) => table
                .rows
                .iter()
                .filter(|(_, row)| matches(row, &select.filter))
                .map(|(id, row)| (*id, row.clone()))
                .collect(),
            None => Vec::new(),
        };

        // Stable sort: ties beyond the declared fields keep id order.
        sort_rows(&mut rows, &select.sort);

        let offset = select.offset.unwrap_or(0) as usize;
        let mut rows: Vec<(i64, Row)> = rows.into_iter().skip(offset).collect();
        if let Some(limit) = select.limit {
            rows.truncate(limit as usize);
        }
        rows
    }

    /// Re-read rows by id after lock acquisition, dropping any deleted in
    /// the meantime.
    pub(crate) fn rows_by_ids(&self, table: &str, ids: &[i64]) -> Vec<(i64, Row)> {
        match self.tables.get(table) {
            Some(table) => ids
                .iter()
                .filter_map(|id| table.rows.get(id).map(|row| (*id, row.clone())))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Project stored rows onto a select's column set.
    pub(crate) fn project(
        &self,
        select: &SelectStatement,
        rows: Vec<(i64, Row)>,
    ) -> KernelResult<Vec<Row>> {
        match &select.columns {
            ColumnSet::All => Ok(rows.into_iter().map(|(_, row)| row).collect()),
            ColumnSet::Only(columns) => rows
                .into_iter()
                .map(|(_, row)| {
                    let mut projected = Row::new();
                    for column in columns {
                        let value = row.get(column).cloned().ok_or_else(|| {
                            KernelError::store(format!(
                                "Unknown column '{column}' in table '{}'",
                                select.table
                            ))
                        })?;
                        projected.push(column.clone(), value);
                    }
                    Ok(projected)
                })
                .collect(),
        }
    }

    /// Count rows matching a filter.
    pub(crate) fn count(&self, count: &CountStatement) -> i64 {
        match self.tables.get(&count.table) {
            Some(table) => table
                .rows
                .values()
                .filter(|row| matches(row, &count.filter))
                .count() as i64,
            None => 0,
        }
    }

    /// The ids of rows matching a filter, in storage order.
    pub(crate) fn matching_ids(&self, table: &str, filter: &Filter) -> Vec<i64> {
        match self.tables.get(table) {
            Some(table) => table
                .rows
                .iter()
                .filter(|(_, row)| matches(row, filter))
                .map(|(id, _)| *id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Insert a row, assigning the identity when the `id` cell is null.
    /// Returns the stored row.
    pub(crate) fn insert(&self, insert: &InsertStatement) -> KernelResult<(i64, Row)> {
        let mut table = self
            .tables
            .entry(insert.table.clone())
            .or_insert_with(Table::new);
        let id = match insert.row.get("id") {
            Some(Value::Int(id)) => *id,
            _ => table.assign_id(),
        };
        if table.rows.contains_key(&id) {
            return Err(KernelError::store(format!(
                "Duplicate id {id} in table '{}'",
                insert.table
            )));
        }
        let mut row = insert.row.clone();
        row.set("id", id);
        table.rows.insert(id, row.clone());
        Ok((id, row))
    }

    /// Apply an update's assignments to one row, re-checking the filter.
    /// Returns the prior row when the row was mutated.
    pub(crate) fn apply_update(
        &self,
        update: &UpdateStatement,
        id: i64,
    ) -> KernelResult<Option<Row>> {
        let mut table = match self.tables.get_mut(&update.table) {
            Some(table) => table,
            None => return Ok(None),
        };
        let row = match table.rows.get_mut(&id) {
            Some(row) if matches(row, &update.filter) => row,
            _ => return Ok(None),
        };
        let prior = row.clone();
        for assignment in &update.assignments {
            match &assignment.op {
                AssignOp::Set(value) => row.set(&assignment.column, value.clone()),
                AssignOp::Increment(by) => {
                    let current = row.get(&assignment.column).cloned().unwrap_or(Value::Null);
                    match current {
                        Value::Int(v) => row.set(&assignment.column, Value::Int(v + by)),
                        Value::Null => {}
                        other => {
                            return Err(KernelError::store(format!(
                                "Cannot increment {} column '{}'",
                                other.type_name(),
                                assignment.column
                            )));
                        }
                    }
                }
            }
        }
        Ok(Some(prior))
    }

    /// Delete one row, re-checking the filter. Returns the prior row when
    /// the row was removed.
    pub(crate) fn apply_delete(&self, table: &str, filter: &Filter, id: i64) -> Option<Row> {
        let mut table = self.tables.get_mut(table)?;
        match table.rows.get(&id) {
            Some(row) if matches(row, filter) => {}
            _ => return None,
        }
        table.rows.remove(&id)
    }

    /// Put a row back (rollback of update/delete).
    pub(crate) fn restore_row(&self, table: &str, id: i64, row: Row) {
        let mut table = self.tables.entry(table.to_string()).or_insert_with(Table::new);
        table.rows.insert(id, row);
    }

    /// Remove a row (rollback of insert).
    pub(crate) fn remove_row(&self, table: &str, id: i64) {
        if let Some(mut table) = self.tables.get_mut(table) {
            table.rows.remove(&id);
        }
    }

    /// Acquire a write lock on one row, waiting while another session
    /// holds it. Re-entrant per session.
    pub(crate) async fn acquire_lock(&self, key: LockKey, owner: Uuid) {
        loop {
            let released = self.lock_released.notified();
            tokio::pin!(released);
            // Register for wakeups before checking, so a release between
            // the check and the await is not missed.
            released.as_mut().enable();
            let acquired = match self.locks.entry(key.clone()) {
                Entry::Occupied(entry) => *entry.get() == owner,
                Entry::Vacant(entry) => {
                    entry.insert(owner);
                    true
                }
            };
            if acquired {
                return;
            }
            released.await;
        }
    }

    /// Release the given locks held by `owner` and wake waiters.
    pub(crate) fn release_locks(&self, owner: Uuid, keys: &[LockKey]) {
        for key in keys {
            self.locks.remove_if(key, |_, holder| *holder == owner);
        }
        self.lock_released.notify_waiters();
    }
}

/// Whether a stored row matches a filter conjunction.
fn matches(row: &Row, filter: &Filter) -> bool {
    let null = Value::Null;
    filter.conditions.iter().all(|condition| {
        let cell = row.get(&condition.field).unwrap_or(&null);
        match condition.op {
            FilterOp::IsNull => cell.is_null(),
            FilterOp::IsNotNull => !cell.is_null(),
            FilterOp::In => match &condition.value {
                Value::List(values) => values.iter().any(|value| value == cell),
                other => other == cell,
            },
            FilterOp::Like => match (cell.as_str(), condition.value.as_str()) {
                (Some(text), Some(pattern)) => like_match(text, pattern),
                _ => false,
            },
            op => {
                if cell.is_null() || condition.value.is_null() {
                    return false;
                }
                match cell.compare(&condition.value) {
                    Some(ordering) => match op {
                        FilterOp::Eq => ordering == Ordering::Equal,
                        FilterOp::Ne => ordering != Ordering::Equal,
                        FilterOp::Gt => ordering == Ordering::Greater,
                        FilterOp::Gte => ordering != Ordering::Less,
                        FilterOp::Lt => ordering == Ordering::Less,
                        FilterOp::Lte => ordering != Ordering::Greater,
                        _ => false,
                    },
                    None => false,
                }
            }
        }
    })
}

/// Match a SQL `LIKE` pattern supporting `%` wildcards.
fn like_match(text: &str, pattern: &str) -> bool {
    let segments: Vec<&str> = pattern.split('%').collect();
    if segments.len() == 1 {
        return text == pattern;
    }
    let mut rest = text;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(segment) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if i == segments.len() - 1 {
            return rest.ends_with(segment);
        } else {
            match rest.find(segment) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }
    }
    true
}

fn sort_rows(rows: &mut [(i64, Row)], sort: &[SortField]) {
    if sort.is_empty() {
        return;
    }
    let null = Value::Null;
    rows.sort_by(|(_, a), (_, b)| {
        for field in sort {
            let left = a.get(&field.field).unwrap_or(&null);
            let right = b.get(&field.field).unwrap_or(&null);
            let ordering = left.compare(right).unwrap_or(Ordering::Equal);
            let ordering = match field.direction {
                roster_core::types::SortDirection::Asc => ordering,
                roster_core::types::SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// The instrumented in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the store's statement log.
    pub fn log(&self) -> QueryLog {
        self.shared.log.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Session = MemorySession;

    async fn session(&self) -> KernelResult<MemorySession> {
        Ok(MemorySession::new(self.shared.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_matches_wildcards() {
        assert!(like_match("member1", "member%"));
        assert!(like_match("member1", "%1"));
        assert!(like_match("member1", "%ember%"));
        assert!(!like_match("member1", "team%"));
        assert!(like_match("member1", "member1"));
    }
}
