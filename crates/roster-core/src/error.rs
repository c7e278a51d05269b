//! Unified error types for the Roster kernel.
//!
//! All crates map their internal errors into [`KernelError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A row did not match the shape of the record it was mapped into.
    SchemaMismatch,
    /// A projection shape referenced a field with no resolvable source.
    UnresolvedProjectionField,
    /// A lazy relation was dereferenced outside an active session scope.
    DetachedAccess,
    /// A pessimistic lock was requested without an active transaction.
    NoActiveTransaction,
    /// An optimistic version conflict occurred on update or delete.
    StaleData,
    /// An identity lookup missed.
    NotFound,
    /// The backing store failed.
    Store,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch => write!(f, "SCHEMA_MISMATCH"),
            Self::UnresolvedProjectionField => write!(f, "UNRESOLVED_PROJECTION_FIELD"),
            Self::DetachedAccess => write!(f, "DETACHED_ACCESS"),
            Self::NoActiveTransaction => write!(f, "NO_ACTIVE_TRANSACTION"),
            Self::StaleData => write!(f, "STALE_DATA"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Store => write!(f, "STORE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
        }
    }
}

/// The unified error type used throughout the Roster kernel.
///
/// Crate-specific errors are mapped into `KernelError` using `From` impls
/// or explicit `.map_err()` calls. Mapping and projection errors surface
/// immediately to the caller; lock and staleness errors are never silently
/// retried by the kernel — retry policy is the caller's responsibility.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct KernelError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl KernelError {
    /// Create a new kernel error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new kernel error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a schema-mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMismatch, message)
    }

    /// Create an unresolved-projection-field error.
    pub fn unresolved_field(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnresolvedProjectionField, message)
    }

    /// Create a detached-access error.
    pub fn detached_access(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DetachedAccess, message)
    }

    /// Create a no-active-transaction error.
    pub fn no_active_transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoActiveTransaction, message)
    }

    /// Create a stale-data error.
    pub fn stale_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StaleData, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }
}

impl Clone for KernelError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for KernelError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
