//! Integration tests for the concurrency controller: pessimistic locks,
//! bulk statements, and transaction rollback.

mod common;

use std::time::Duration;

use roster_core::error::ErrorKind;
use roster_core::traits::Store;
use roster_entity::Member;
use roster_session::{MemberRepository, Repository, Session};
use roster_store::MemoryStore;

#[tokio::test]
async fn test_pessimistic_lock_requires_a_transaction() {
    common::init_tracing();
    let store = MemoryStore::new();
    common::seed_members(&store, &[("member1", 10)]).await;
    let mut session = common::open_session(&store).await;

    let err = MemberRepository::find_lock_by_username(&mut session, "member1")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoActiveTransaction);
}

#[tokio::test]
async fn test_pessimistic_lock_blocks_a_concurrent_writer_until_commit() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("member1", 10)]).await;

    let mut locker = common::open_session(&store).await;
    locker.begin().await.unwrap();
    let locked = MemberRepository::find_lock_by_username(&mut locker, "member1")
        .await
        .unwrap();
    assert_eq!(locked.len(), 1);

    let writer_store = store.clone();
    let writer = tokio::spawn(async move {
        let mut session = Session::new(writer_store.session().await.unwrap());
        MemberRepository::bulk_age_plus(&mut session, 0).await.unwrap()
    });

    // The writer is blocked on the locked row.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!writer.is_finished());

    locker.commit().await.unwrap();
    let affected = writer.await.unwrap();
    assert_eq!(affected, 1);
}

#[tokio::test]
async fn test_bulk_update_counts_matches_and_evicts_loaded_records() {
    let store = MemoryStore::new();
    common::seed_members(
        &store,
        &[
            ("member2", 10),
            ("member1", 15),
            ("member4", 20),
            ("member3", 25),
            ("member5", 30),
        ],
    )
    .await;
    let mut session = common::open_session(&store).await;

    // Load one affected member into the unit of work first.
    let before = MemberRepository::find_by_username(&mut session, "member4")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before.age, 20);
    let id = before.id.unwrap();
    assert!(session.is_cached::<Member>(id));

    let affected = MemberRepository::bulk_age_plus(&mut session, 20).await.unwrap();
    assert_eq!(affected, 3);

    // The cache was evicted before the next read, which sees the bulk
    // write.
    assert!(!session.is_cached::<Member>(id));
    let after = MemberRepository::get(&mut session, id).await.unwrap();
    assert_eq!(after.age, 21);

    let mut ages: Vec<i32> = MemberRepository::find_all(&mut session, Vec::new())
        .await
        .unwrap()
        .iter()
        .map(|m| m.age)
        .collect();
    ages.sort_unstable();
    assert_eq!(ages, vec![10, 15, 21, 26, 31]);
}

#[tokio::test]
async fn test_bulk_update_does_not_see_unflushed_changes() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("member1", 19)]).await;
    let mut session = common::open_session(&store).await;

    let mut member = MemberRepository::find_by_username(&mut session, "member1")
        .await
        .unwrap()
        .unwrap();
    member.age = 25;
    MemberRepository::save(&mut session, &mut member)
        .await
        .unwrap();

    // The pending update is invisible to the bulk statement, and the
    // eviction drops it.
    let affected = MemberRepository::bulk_age_plus(&mut session, 20).await.unwrap();
    assert_eq!(affected, 0);

    let found = MemberRepository::find_by_username(&mut session, "member1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.age, 19);
}

#[tokio::test]
async fn test_rollback_discards_writes_and_releases_locks() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("member1", 10)]).await;

    let mut session = common::open_session(&store).await;
    session.begin().await.unwrap();
    let locked = MemberRepository::find_lock_by_username(&mut session, "member1")
        .await
        .unwrap();
    let id = locked[0].id.unwrap();

    let mut inserted = Member::new("member2", 20);
    MemberRepository::save(&mut session, &mut inserted)
        .await
        .unwrap();
    session.rollback().await.unwrap();

    // The insert was undone and the lock released: a fresh writer
    // proceeds immediately.
    let mut verifier = common::open_session(&store).await;
    assert_eq!(MemberRepository::count(&mut verifier).await.unwrap(), 1);
    let affected = MemberRepository::bulk_age_plus(&mut verifier, 0).await.unwrap();
    assert_eq!(affected, 1);
    let member = MemberRepository::get(&mut verifier, id).await.unwrap();
    assert_eq!(member.age, 11);
}
