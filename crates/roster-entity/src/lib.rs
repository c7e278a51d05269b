//! # roster-entity
//!
//! Domain records for the Roster kernel: the [`Record`] trait implemented
//! by every persisted entity, the embedded audit block, the explicit
//! relation type, and the membership domain models (`Member`, `Team`).

pub mod audit;
pub mod member;
pub mod record;
pub mod relation;
pub mod team;

pub use audit::AuditBlock;
pub use member::Member;
pub use record::{Record, RelationDef};
pub use relation::Relation;
pub use team::Team;
