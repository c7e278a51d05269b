//! Explicit lazy relations between records.

use serde::{Deserialize, Serialize};

use roster_core::{KernelError, KernelResult};

use crate::record::Record;

/// A to-one reference from one record to another.
///
/// A relation starts `Unloaded`, holding only the target identity, and
/// becomes `Loaded` through an explicit resolve bound to an active
/// session. Dereferencing an `Unloaded` relation fails with
/// `DetachedAccess` — there is no implicit fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Relation<T> {
    /// Only the target identity is known.
    Unloaded(i64),
    /// The target record has been loaded.
    Loaded(Box<T>),
}

impl<T> Relation<T> {
    /// A relation by target identity.
    pub fn unloaded(id: i64) -> Self {
        Self::Unloaded(id)
    }

    /// A relation holding an already-loaded record.
    pub fn loaded(value: T) -> Self {
        Self::Loaded(Box::new(value))
    }

    /// Whether the target record has been loaded.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Dereference the loaded target.
    ///
    /// Fails with `DetachedAccess` when the relation is still unloaded;
    /// resolve it through the owning session first.
    pub fn get(&self) -> KernelResult<&T> {
        match self {
            Self::Loaded(value) => Ok(value),
            Self::Unloaded(id) => Err(KernelError::detached_access(format!(
                "Relation to id {id} has not been resolved within an active session"
            ))),
        }
    }
}

impl<T: Record> Relation<T> {
    /// The target identity, if known.
    pub fn target_id(&self) -> Option<i64> {
        match self {
            Self::Unloaded(id) => Some(*id),
            Self::Loaded(value) => value.id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_access_is_detached() {
        let relation: Relation<crate::team::Team> = Relation::unloaded(7);
        let err = relation.get().unwrap_err();
        assert_eq!(
            err.kind,
            roster_core::error::ErrorKind::DetachedAccess
        );
    }

    #[test]
    fn loaded_access_succeeds() {
        let relation = Relation::loaded(crate::team::Team::new("teamA"));
        assert_eq!(relation.get().unwrap().name, "teamA");
    }
}
