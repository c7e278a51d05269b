//! The pagination engine: counted pages and look-ahead slices.

use serde::Serialize;

use roster_core::traits::{Store, StoreSession};
use roster_core::types::{CountStatement, Filter, Page, PageRequest, SelectStatement, Slice, SortField};
use roster_core::KernelResult;
use roster_entity::Record;

use crate::session::Session;

/// Counted paging: issue the content query with the request's offset and
/// limit, then an independent counting query.
///
/// The caller may supply a cheaper `count_filter` when the content query
/// carries conditions or ordering irrelevant to counting; it defaults to
/// the content filter.
pub async fn paginate<R, S>(
    session: &mut Session<S>,
    filter: Filter,
    page: PageRequest,
    sort: Vec<SortField>,
    count_filter: Option<Filter>,
) -> KernelResult<Page<R>>
where
    R: Record + Serialize,
    S: StoreSession,
{
    let select = SelectStatement::all(R::table())
        .filter(filter.clone())
        .sort(sort)
        .range(page.offset(), page.limit());
    let content = session.query::<R>(select).await?;

    let count = CountStatement::new(R::table(), count_filter.unwrap_or(filter));
    let total = session.count(count).await?;

    Ok(Page::new(content, page, total.max(0) as u64))
}

/// Look-ahead slicing: fetch `page_size + 1` rows, truncate, and derive
/// `has_next` from the overflow. No counting query is ever issued.
pub async fn slice<R, S>(
    session: &mut Session<S>,
    filter: Filter,
    page: PageRequest,
    sort: Vec<SortField>,
) -> KernelResult<Slice<R>>
where
    R: Record + Serialize,
    S: StoreSession,
{
    let select = SelectStatement::all(R::table())
        .filter(filter)
        .sort(sort)
        .range(page.offset(), page.look_ahead_limit());
    let content = session.query::<R>(select).await?;
    Ok(Slice::from_look_ahead(content, page))
}

/// Counted paging with the content and count queries run concurrently as
/// two independent futures, each on its own isolated store session,
/// joined before the page is built.
///
/// Cancelling the returned future cancels both sub-queries; partial
/// results are discarded, never returned.
pub async fn paginate_concurrent<R, St>(
    store: &St,
    filter: Filter,
    page: PageRequest,
    sort: Vec<SortField>,
    count_filter: Option<Filter>,
) -> KernelResult<Page<R>>
where
    R: Record + Serialize,
    St: Store,
{
    let content_filter = filter.clone();
    let count_filter = count_filter.unwrap_or(filter);

    let content = async {
        let mut session = Session::new(store.session().await?);
        let select = SelectStatement::all(R::table())
            .filter(content_filter)
            .sort(sort)
            .range(page.offset(), page.limit());
        session.query::<R>(select).await
    };
    let total = async {
        let mut session = Session::new(store.session().await?);
        session
            .count(CountStatement::new(R::table(), count_filter))
            .await
    };

    let (content, total) = tokio::try_join!(content, total)?;
    Ok(Page::new(content, page, total.max(0) as u64))
}
