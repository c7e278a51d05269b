//! Integration tests for the member repository facade and session
//! lifecycle: round trips, audit stamping, flush ordering, relations,
//! and optimistic concurrency.

mod common;

use roster_core::error::ErrorKind;
use roster_entity::{Member, Team};
use roster_session::{MemberRepository, Repository, TeamRepository};
use roster_store::MemoryStore;

#[tokio::test]
async fn test_save_and_find_by_id_round_trip() {
    common::init_tracing();
    let store = MemoryStore::new();
    let mut session = common::open_session(&store).await;

    // given
    let mut member = Member::new("memberA", 10);

    // when
    MemberRepository::save(&mut session, &mut member)
        .await
        .unwrap();

    // then
    let id = member.id.expect("id assigned on save");
    let found = MemberRepository::find_by_id(&mut session, id)
        .await
        .unwrap()
        .expect("member found");
    assert_eq!(found.username, member.username);
    assert_eq!(found.age, member.age);
    assert_eq!(found.id, member.id);

    // System-stamped audit fields are non-null and consistent.
    assert!(found.audit.created_at.is_some());
    assert_eq!(found.audit.created_at, found.audit.updated_at);
}

#[tokio::test]
async fn test_basic_crud() {
    let store = MemoryStore::new();
    let mut session = common::open_session(&store).await;

    let mut member1 = Member::new("memberA", 10);
    let mut member2 = Member::new("memberB", 20);
    MemberRepository::save(&mut session, &mut member1)
        .await
        .unwrap();
    MemberRepository::save(&mut session, &mut member2)
        .await
        .unwrap();

    let found1 = MemberRepository::find_by_id(&mut session, member1.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found1.username, member1.username);
    let found2 = MemberRepository::find_by_id(&mut session, member2.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found2.username, member2.username);

    let all = MemberRepository::find_all(&mut session, Vec::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(MemberRepository::count(&mut session).await.unwrap(), 2);

    MemberRepository::delete(&mut session, &found1).await.unwrap();
    MemberRepository::delete(&mut session, &found2).await.unwrap();
    assert_eq!(MemberRepository::count(&mut session).await.unwrap(), 0);
}

#[tokio::test]
async fn test_audit_stamp_advances_on_update() {
    let store = MemoryStore::new();
    let mut session = common::open_session(&store).await.with_actor("admin");

    let mut member = Member::new("member1", 10);
    MemberRepository::save(&mut session, &mut member)
        .await
        .unwrap();
    let created_at = member.audit.created_at.unwrap();
    assert_eq!(member.audit.updated_at, Some(created_at));
    assert_eq!(member.audit.created_by.as_deref(), Some("admin"));

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    member.username = "new-member1".to_string();
    MemberRepository::save(&mut session, &mut member)
        .await
        .unwrap();
    session.flush().await.unwrap();

    // A fresh unit of work observes the flushed state.
    let mut verifier = common::open_session(&store).await;
    let found = MemberRepository::find_by_id(&mut verifier, member.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.username, "new-member1");
    assert_eq!(found.audit.created_at, Some(created_at));
    assert!(found.audit.updated_at.unwrap() > created_at);
}

#[tokio::test]
async fn test_reads_flush_pending_updates_first() {
    let store = MemoryStore::new();
    let log = store.log();
    let mut session = common::open_session(&store).await;

    let mut member = Member::new("member1", 10);
    MemberRepository::save(&mut session, &mut member)
        .await
        .unwrap();

    member.age = 11;
    MemberRepository::save(&mut session, &mut member)
        .await
        .unwrap();
    // The update is deferred: nothing has been flushed yet.
    assert_eq!(log.update_statements(), 0);

    let all = MemberRepository::find_all(&mut session, Vec::new())
        .await
        .unwrap();
    assert_eq!(all[0].age, 11);
    // The read forced the pending update out first.
    assert_eq!(log.update_statements(), 1);

    let statements = log.statements();
    let update_pos = statements
        .iter()
        .position(|sql| sql.starts_with("UPDATE"))
        .unwrap();
    let select_pos = statements
        .iter()
        .rposition(|sql| sql.starts_with("SELECT *"))
        .unwrap();
    assert!(update_pos < select_pos);
}

#[tokio::test]
async fn test_find_by_username_and_age_greater_than() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("memberA", 10), ("memberA", 20)]).await;
    let mut session = common::open_session(&store).await;

    let members =
        MemberRepository::find_by_username_and_age_greater_than(&mut session, "memberA", 15)
            .await
            .unwrap();

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].username, "memberA");
    assert_eq!(members[0].age, 20);
}

#[tokio::test]
async fn test_find_by_names() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("memberA", 10), ("memberB", 20), ("memberC", 30)]).await;
    let mut session = common::open_session(&store).await;

    let members = MemberRepository::find_by_names(&mut session, &["memberA", "memberB"])
        .await
        .unwrap();

    assert_eq!(members.len(), 2);
    let names: Vec<&str> = members.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["memberA", "memberB"]);
}

#[tokio::test]
async fn test_find_usernames_via_closed_projection() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("memberA", 10), ("memberB", 20)]).await;
    let mut session = common::open_session(&store).await;

    let usernames = MemberRepository::find_usernames(&mut session).await.unwrap();
    assert_eq!(usernames, vec!["memberA".to_string(), "memberB".to_string()]);
}

#[tokio::test]
async fn test_get_missing_member_is_not_found() {
    let store = MemoryStore::new();
    let mut session = common::open_session(&store).await;

    let err = MemberRepository::get(&mut session, 999).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_unresolved_relation_access_is_detached() {
    let store = MemoryStore::new();
    let mut session = common::open_session(&store).await;

    let mut team = Team::new("teamA");
    TeamRepository::save(&mut session, &mut team).await.unwrap();
    let mut member = Member::with_team("member1", 10, team.id.unwrap());
    MemberRepository::save(&mut session, &mut member)
        .await
        .unwrap();

    // A fresh load leaves the relation unloaded.
    let mut reader = common::open_session(&store).await;
    let mut found = MemberRepository::get(&mut reader, member.id.unwrap())
        .await
        .unwrap();
    let relation = found.team.as_mut().expect("member has a team");
    let err = relation.get().unwrap_err();
    assert_eq!(err.kind, ErrorKind::DetachedAccess);

    // Resolving through the session loads the team.
    let team = reader.resolve(relation).await.unwrap();
    assert_eq!(team.name, "teamA");
    assert!(relation.is_loaded());
}

#[tokio::test]
async fn test_concurrent_update_is_stale() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("member1", 10)]).await;

    let mut first = common::open_session(&store).await;
    let mut second = common::open_session(&store).await;
    let mut from_first = MemberRepository::find_by_username(&mut first, "member1")
        .await
        .unwrap()
        .unwrap();
    let mut from_second = MemberRepository::find_by_username(&mut second, "member1")
        .await
        .unwrap()
        .unwrap();

    from_first.age = 11;
    MemberRepository::save(&mut first, &mut from_first)
        .await
        .unwrap();
    first.flush().await.unwrap();

    from_second.age = 12;
    MemberRepository::save(&mut second, &mut from_second)
        .await
        .unwrap();
    let err = second.flush().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StaleData);
}

#[tokio::test]
async fn test_delete_of_concurrently_modified_member_is_stale() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("member1", 10)]).await;

    let mut first = common::open_session(&store).await;
    let mut second = common::open_session(&store).await;
    let mut from_first = MemberRepository::find_by_username(&mut first, "member1")
        .await
        .unwrap()
        .unwrap();
    let from_second = MemberRepository::find_by_username(&mut second, "member1")
        .await
        .unwrap()
        .unwrap();

    from_first.age = 11;
    MemberRepository::save(&mut first, &mut from_first)
        .await
        .unwrap();
    first.flush().await.unwrap();

    let err = MemberRepository::delete(&mut second, &from_second)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StaleData);
}

#[tokio::test]
async fn test_merge_save_of_unloaded_record() {
    let store = MemoryStore::new();
    common::seed_members(&store, &[("member1", 10)]).await;

    // Identify the row without keeping it cached.
    let id = {
        let mut reader = common::open_session(&store).await;
        MemberRepository::find_by_username(&mut reader, "member1")
            .await
            .unwrap()
            .unwrap()
            .id
            .unwrap()
    };

    // Attach an identified record this session never loaded.
    let mut session = common::open_session(&store).await;
    let mut detached = Member::new("member1", 42);
    detached.id = Some(id);
    MemberRepository::save(&mut session, &mut detached)
        .await
        .unwrap();
    session.flush().await.unwrap();

    let mut verifier = common::open_session(&store).await;
    let found = MemberRepository::get(&mut verifier, id).await.unwrap();
    assert_eq!(found.age, 42);
    assert_eq!(found.version, 1);
}
