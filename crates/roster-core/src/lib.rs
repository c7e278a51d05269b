//! # roster-core
//!
//! Core crate for the Roster data-access kernel. Contains the store seam
//! traits, configuration schemas, statement/filter/pagination/projection
//! types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Roster crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::KernelError;
pub use result::KernelResult;
