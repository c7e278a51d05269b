//! The entity mapper: row conversion and audit lifecycle hooks.

use chrono::Utc;

use roster_core::KernelResult;
use roster_core::types::Row;
use roster_entity::Record;

/// Convert a raw row into a typed record.
///
/// Fails with `SchemaMismatch` when the row is missing a required column.
pub fn row_to_record<R: Record>(row: &Row) -> KernelResult<R> {
    R::from_row(row)
}

/// Insert hook: stamp `created_at`/`created_by` and copy them into
/// `updated_at`/`updated_by`.
///
/// Runs exactly once per insert; re-invoking on an already-stamped record
/// is a no-op.
pub fn before_insert<R: Record>(record: &mut R, actor: Option<&str>) {
    if record.audit().is_stamped() {
        return;
    }
    let now = Utc::now();
    let audit = record.audit_mut();
    audit.created_at = Some(now);
    audit.updated_at = Some(now);
    audit.created_by = actor.map(str::to_string);
    audit.updated_by = actor.map(str::to_string);
}

/// Update hook: stamp only `updated_at`/`updated_by`.
///
/// The session invokes this once per observed mutation; without an
/// intervening mutation it is never re-invoked.
pub fn before_update<R: Record>(record: &mut R, actor: Option<&str>) {
    let audit = record.audit_mut();
    audit.updated_at = Some(Utc::now());
    audit.updated_by = actor.map(str::to_string);
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_entity::Member;

    #[test]
    fn insert_hook_stamps_created_equal_to_updated() {
        let mut member = Member::new("member1", 10);
        before_insert(&mut member, Some("admin"));

        assert!(member.audit.created_at.is_some());
        assert_eq!(member.audit.created_at, member.audit.updated_at);
        assert_eq!(member.audit.created_by.as_deref(), Some("admin"));
        assert_eq!(member.audit.updated_by.as_deref(), Some("admin"));
    }

    #[test]
    fn insert_hook_is_idempotent() {
        let mut member = Member::new("member1", 10);
        before_insert(&mut member, None);
        let stamped = member.audit.clone();

        before_insert(&mut member, Some("late-actor"));
        assert_eq!(member.audit, stamped);
    }

    #[test]
    fn update_hook_advances_only_updated_fields() {
        let mut member = Member::new("member1", 10);
        before_insert(&mut member, Some("admin"));
        let created_at = member.audit.created_at;
        let first_updated = member.audit.updated_at.unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        before_update(&mut member, Some("editor"));

        assert_eq!(member.audit.created_at, created_at);
        assert!(member.audit.updated_at.unwrap() > first_updated);
        assert_eq!(member.audit.created_by.as_deref(), Some("admin"));
        assert_eq!(member.audit.updated_by.as_deref(), Some("editor"));
    }
}
