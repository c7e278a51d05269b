//! Shared helpers for kernel integration tests.
#![allow(dead_code)]

use roster_core::traits::Store;
use roster_entity::Member;
use roster_session::{MemberRepository, Repository, Session};
use roster_store::MemoryStore;
use roster_store::memory::MemorySession;

/// Initialize tracing for test output. Safe to call repeatedly.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

/// Open a fresh unit of work over the store.
pub async fn open_session(store: &MemoryStore) -> Session<MemorySession> {
    Session::new(store.session().await.expect("open memory session"))
}

/// Seed members through the repository facade.
pub async fn seed_members(store: &MemoryStore, members: &[(&str, i32)]) {
    let mut session = open_session(store).await;
    for (username, age) in members {
        let mut member = Member::new(*username, *age);
        MemberRepository::save(&mut session, &mut member)
            .await
            .expect("seed member");
    }
}

/// The five-member fixture shared by the pagination tests: four members
/// aged 10 and one aged 30, inserted out of name order.
pub async fn seed_five(store: &MemoryStore) {
    seed_members(
        store,
        &[
            ("member2", 10),
            ("member1", 10),
            ("member4", 10),
            ("member3", 10),
            ("member5", 30),
        ],
    )
    .await;
}
