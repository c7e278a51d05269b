//! Convenience result type alias for the Roster kernel.

use crate::error::KernelError;

/// A specialized `Result` type for kernel operations.
///
/// This is defined as a convenience so that every crate does not need to
/// write `Result<T, KernelError>` explicitly.
pub type KernelResult<T> = Result<T, KernelError>;
