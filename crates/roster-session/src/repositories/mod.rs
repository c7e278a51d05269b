//! Repository facades: the entry point consumers call.

pub mod member;
pub mod shapes;
pub mod team;

use async_trait::async_trait;

use roster_core::KernelResult;
use roster_core::traits::StoreSession;
use roster_core::types::{SelectStatement, SortField};
use roster_entity::Record;

use crate::session::Session;

pub use member::MemberRepository;
pub use team::TeamRepository;

/// Generic CRUD surface shared by every repository facade.
///
/// Methods operate on a caller-supplied unit of work; entity-specific
/// finders are defined on the concrete repository types.
#[async_trait]
pub trait Repository<R: Record> {
    /// Save a record: insert when transient, mark dirty when managed.
    async fn save<S: StoreSession>(session: &mut Session<S>, record: &mut R) -> KernelResult<()> {
        session.save(record).await
    }

    /// Find a record by its identity.
    async fn find_by_id<S: StoreSession>(
        session: &mut Session<S>,
        id: i64,
    ) -> KernelResult<Option<R>> {
        session.find_by_id(id).await
    }

    /// Find a record by its identity, failing with `NotFound` on a miss.
    async fn get<S: StoreSession>(session: &mut Session<S>, id: i64) -> KernelResult<R> {
        session.get(id).await
    }

    /// Find all records, optionally ordered.
    async fn find_all<S: StoreSession>(
        session: &mut Session<S>,
        sort: Vec<SortField>,
    ) -> KernelResult<Vec<R>> {
        session.query(SelectStatement::all(R::table()).sort(sort)).await
    }

    /// Delete a record.
    async fn delete<S: StoreSession>(session: &mut Session<S>, record: &R) -> KernelResult<()> {
        session.delete(record).await
    }

    /// Count all records.
    async fn count<S: StoreSession>(session: &mut Session<S>) -> KernelResult<i64> {
        session
            .count(roster_core::types::CountStatement::new(
                R::table(),
                roster_core::types::Filter::none(),
            ))
            .await
    }
}
