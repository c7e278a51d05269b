//! Core traits defined in `roster-core` and implemented by other crates.

pub mod store;

pub use store::{Store, StoreSession};
