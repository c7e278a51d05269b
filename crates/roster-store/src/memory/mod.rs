//! Instrumented in-memory store backend.
//!
//! Interprets structured statements directly against shared in-memory
//! tables. Every executed statement is also rendered to SQL and recorded
//! in a query log with per-kind counters, so tests can assert on the
//! exact statements a unit of work would issue (for example, that a
//! slice never issues a counting query).

mod engine;
mod instrument;
mod session;

pub use engine::MemoryStore;
pub use instrument::QueryLog;
pub use session::MemorySession;
