//! # roster-store
//!
//! Store backends implementing the kernel's `Store`/`StoreSession` seam:
//! an instrumented in-memory engine for tests and embedded use, and a
//! PostgreSQL backend over sqlx. Both interpret the same structured
//! statements; `statement::render` centralizes the SQL text they share.

pub mod memory;
pub mod postgres;
pub mod statement;

pub use memory::{MemoryStore, QueryLog};
pub use postgres::PgStore;
