//! Integration tests for counted paging and look-ahead slicing.

mod common;

use roster_core::types::{Filter, PageRequest, SortField};
use roster_session::MemberRepository;
use roster_store::MemoryStore;

#[tokio::test]
async fn test_paginate_five_rows_sorted_descending() {
    common::init_tracing();
    let store = MemoryStore::new();
    common::seed_five(&store).await;
    let mut session = common::open_session(&store).await;

    let page = MemberRepository::paginate(
        &mut session,
        Filter::none(),
        PageRequest::new(0, 3),
        vec![SortField::desc("username")],
    )
    .await
    .unwrap();

    let names: Vec<&str> = page.content.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["member5", "member4", "member3"]);
    assert_eq!(page.total_elements, 5);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.page_index, 0);
    assert!(page.is_first());
    assert!(page.has_next());
}

#[tokio::test]
async fn test_paginate_by_age_issues_one_count_query() {
    let store = MemoryStore::new();
    common::seed_five(&store).await;
    let log = store.log();
    log.reset();
    let mut session = common::open_session(&store).await;

    let page = MemberRepository::paginate_by_age(
        &mut session,
        10,
        PageRequest::new(0, 3),
        vec![SortField::desc("username")],
    )
    .await
    .unwrap();

    let pairs: Vec<(&str, i32)> = page
        .content
        .iter()
        .map(|m| (m.username.as_str(), m.age))
        .collect();
    assert_eq!(
        pairs,
        vec![("member4", 10), ("member3", 10), ("member2", 10)]
    );
    assert_eq!(page.total_elements, 4);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next());

    // One content query, one independent counting query.
    assert_eq!(log.select_queries(), 1);
    assert_eq!(log.count_queries(), 1);
}

#[tokio::test]
async fn test_slice_never_issues_a_count_query() {
    let store = MemoryStore::new();
    common::seed_five(&store).await;
    let log = store.log();
    log.reset();
    let mut session = common::open_session(&store).await;

    let slice = MemberRepository::slice_by_age(
        &mut session,
        10,
        PageRequest::new(0, 3),
        vec![SortField::desc("username")],
    )
    .await
    .unwrap();

    let names: Vec<&str> = slice.content.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["member4", "member3", "member2"]);
    assert!(slice.has_next);
    assert!(slice.is_first());
    assert_eq!(log.count_queries(), 0);

    // The look-ahead over-fetch is visible in the rendered statement.
    assert!(log.statements().iter().any(|sql| sql.contains("LIMIT")));

    let tail = MemberRepository::slice_by_age(
        &mut session,
        10,
        PageRequest::new(1, 3),
        vec![SortField::desc("username")],
    )
    .await
    .unwrap();
    assert_eq!(tail.content.len(), 1);
    assert_eq!(tail.content[0].username, "member1");
    assert!(!tail.has_next);
    assert_eq!(log.count_queries(), 0);
}

#[tokio::test]
async fn test_slice_matches_page_content() {
    let store = MemoryStore::new();
    common::seed_five(&store).await;
    let mut session = common::open_session(&store).await;

    let page = MemberRepository::paginate(
        &mut session,
        Filter::none(),
        PageRequest::new(0, 3),
        vec![SortField::desc("username")],
    )
    .await
    .unwrap();
    let slice = MemberRepository::slice(
        &mut session,
        Filter::none(),
        PageRequest::new(0, 3),
        vec![SortField::desc("username")],
    )
    .await
    .unwrap();

    let page_names: Vec<&str> = page.content.iter().map(|m| m.username.as_str()).collect();
    let slice_names: Vec<&str> = slice.content.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(page_names, slice_names);
    assert!(slice.has_next);
}

#[tokio::test]
async fn test_paginate_concurrent_joins_content_and_count() {
    let store = MemoryStore::new();
    common::seed_five(&store).await;

    let page = MemberRepository::paginate_by_age_concurrent(
        &store,
        10,
        PageRequest::new(0, 3),
        vec![SortField::desc("username")],
    )
    .await
    .unwrap();

    let names: Vec<&str> = page.content.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["member4", "member3", "member2"]);
    assert_eq!(page.total_elements, 4);
    assert_eq!(page.total_pages, 2);
}

#[tokio::test]
async fn test_empty_result_has_zero_pages() {
    let store = MemoryStore::new();
    common::seed_five(&store).await;
    let mut session = common::open_session(&store).await;

    let page = MemberRepository::paginate_by_age(
        &mut session,
        99,
        PageRequest::new(0, 3),
        Vec::new(),
    )
    .await
    .unwrap();

    assert!(page.content.is_empty());
    assert_eq!(page.total_elements, 0);
    assert_eq!(page.total_pages, 0);
    assert!(!page.has_next());
}
