//! The concurrency controller: pessimistic locks and bulk statements.

use roster_core::traits::StoreSession;
use roster_core::types::{Filter, LockMode, SelectStatement, Statement, UpdateStatement};
use roster_core::{KernelError, KernelResult};
use roster_entity::Record;

use crate::session::Session;

/// Select records with an attached lock mode.
///
/// `PessimisticWrite` acquires a store-held write lock on the selected
/// rows for the duration of the active transaction and therefore requires
/// one: outside an explicit transaction it fails with
/// `NoActiveTransaction`. Lock conflicts are never retried by the kernel.
pub async fn find_with_lock<R, S>(
    session: &mut Session<S>,
    filter: Filter,
    mode: LockMode,
) -> KernelResult<Vec<R>>
where
    R: Record,
    S: StoreSession,
{
    if mode == LockMode::PessimisticWrite && !session.in_transaction() {
        return Err(KernelError::no_active_transaction(
            "Pessimistic write lock requested outside an explicit transaction",
        ));
    }
    let select = SelectStatement::all(R::table()).filter(filter).lock(mode);
    session.query(select).await
}

/// Execute a bulk update directly against the store.
///
/// Bulk statements bypass the mapper and the identity map, and skip the
/// flush ordering: unflushed in-memory changes are not visible to them —
/// flush explicitly first when they must be. After the statement runs,
/// every previously loaded record that could be affected is stale, so the
/// session cache is evicted automatically before any subsequent read.
pub async fn bulk_update<S>(
    session: &mut Session<S>,
    statement: UpdateStatement,
) -> KernelResult<u64>
where
    S: StoreSession,
{
    let affected = session
        .executor_mut()
        .execute_update(&Statement::Update(statement))
        .await?;
    session.clear();
    Ok(affected)
}
