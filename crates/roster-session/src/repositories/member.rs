//! Member repository facade.

use roster_core::KernelResult;
use roster_core::traits::{Store, StoreSession};
use roster_core::types::{
    Assignment, Filter, FilterField, FromShape, LockMode, Page, PageRequest, ProjectionShape,
    SelectStatement, ShapeInstance, Slice, SortField, UpdateStatement, Value,
};
use roster_entity::{Member, Record};

use crate::session::Session;
use crate::{concurrency, pagination, projection};

use super::Repository;
use super::shapes;

/// Repository for member CRUD, finders, projections, pagination, and
/// bulk operations.
pub struct MemberRepository;

impl Repository<Member> for MemberRepository {}

impl MemberRepository {
    /// Find a single member by username.
    pub async fn find_by_username<S: StoreSession>(
        session: &mut Session<S>,
        username: &str,
    ) -> KernelResult<Option<Member>> {
        let select = SelectStatement::all(Member::table())
            .filter(FilterField::eq("username", username).into())
            .limit(1);
        Ok(session.query(select).await?.into_iter().next())
    }

    /// Find members by username with an age strictly above the bound.
    pub async fn find_by_username_and_age_greater_than<S: StoreSession>(
        session: &mut Session<S>,
        username: &str,
        age: i32,
    ) -> KernelResult<Vec<Member>> {
        let select = SelectStatement::all(Member::table()).filter(Filter::of(vec![
            FilterField::eq("username", username),
            FilterField::gt("age", age),
        ]));
        session.query(select).await
    }

    /// Find members whose username is in the given list.
    pub async fn find_by_names<S: StoreSession>(
        session: &mut Session<S>,
        names: &[&str],
    ) -> KernelResult<Vec<Member>> {
        let values = names.iter().map(|name| Value::from(*name)).collect();
        let select = SelectStatement::all(Member::table())
            .filter(FilterField::is_in("username", values).into());
        session.query(select).await
    }

    /// Every username, served by a closed single-column projection.
    pub async fn find_usernames<S: StoreSession>(
        session: &mut Session<S>,
    ) -> KernelResult<Vec<String>> {
        let instances = projection::project::<Member, S>(
            session,
            Filter::none(),
            Vec::new(),
            &shapes::username_only(),
        )
        .await?;
        instances
            .iter()
            .map(|instance| instance.text("username").map(str::to_string))
            .collect()
    }

    /// Counted paging over members of one age.
    ///
    /// The counting query runs with a bare age filter: the content
    /// query's ordering is irrelevant to counting, so the count stays
    /// independently optimizable.
    pub async fn paginate_by_age<S: StoreSession>(
        session: &mut Session<S>,
        age: i32,
        page: PageRequest,
        sort: Vec<SortField>,
    ) -> KernelResult<Page<Member>> {
        let filter: Filter = FilterField::eq("age", age).into();
        pagination::paginate(session, filter.clone(), page, sort, Some(filter)).await
    }

    /// Counted paging with the content and count queries joined from two
    /// isolated sessions.
    pub async fn paginate_by_age_concurrent<St: Store>(
        store: &St,
        age: i32,
        page: PageRequest,
        sort: Vec<SortField>,
    ) -> KernelResult<Page<Member>> {
        let filter: Filter = FilterField::eq("age", age).into();
        pagination::paginate_concurrent(store, filter.clone(), page, sort, Some(filter)).await
    }

    /// Counted paging over an arbitrary filter.
    pub async fn paginate<S: StoreSession>(
        session: &mut Session<S>,
        filter: Filter,
        page: PageRequest,
        sort: Vec<SortField>,
    ) -> KernelResult<Page<Member>> {
        pagination::paginate(session, filter, page, sort, None).await
    }

    /// Look-ahead slicing over members of one age. Never counts.
    pub async fn slice_by_age<S: StoreSession>(
        session: &mut Session<S>,
        age: i32,
        page: PageRequest,
        sort: Vec<SortField>,
    ) -> KernelResult<Slice<Member>> {
        pagination::slice(session, FilterField::eq("age", age).into(), page, sort).await
    }

    /// Look-ahead slicing over an arbitrary filter.
    pub async fn slice<S: StoreSession>(
        session: &mut Session<S>,
        filter: Filter,
        page: PageRequest,
        sort: Vec<SortField>,
    ) -> KernelResult<Slice<Member>> {
        pagination::slice(session, filter, page, sort).await
    }

    /// Materialize members into a projection shape.
    pub async fn project<S: StoreSession>(
        session: &mut Session<S>,
        filter: Filter,
        shape: &ProjectionShape,
    ) -> KernelResult<Vec<ShapeInstance>> {
        projection::project::<Member, S>(session, filter, Vec::new(), shape).await
    }

    /// Materialize members into a shape chosen at call time by type token.
    pub async fn project_as<T: FromShape, S: StoreSession>(
        session: &mut Session<S>,
        filter: Filter,
    ) -> KernelResult<Vec<T>> {
        projection::project_as::<T, Member, S>(session, filter, Vec::new()).await
    }

    /// Increment the age of every member at or above the bound, directly
    /// in the store. Evicts the session cache; see
    /// [`crate::concurrency::bulk_update`].
    pub async fn bulk_age_plus<S: StoreSession>(
        session: &mut Session<S>,
        min_age: i32,
    ) -> KernelResult<u64> {
        let statement = UpdateStatement {
            table: Member::table().to_string(),
            assignments: vec![Assignment::increment("age", 1)],
            filter: FilterField::gte("age", min_age).into(),
        };
        concurrency::bulk_update(session, statement).await
    }

    /// Select members by username under a pessimistic write lock. Must be
    /// called inside an explicit transaction.
    pub async fn find_lock_by_username<S: StoreSession>(
        session: &mut Session<S>,
        username: &str,
    ) -> KernelResult<Vec<Member>> {
        concurrency::find_with_lock(
            session,
            FilterField::eq("username", username).into(),
            LockMode::PessimisticWrite,
        )
        .await
    }
}
