//! Error types for registry operations.

use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The handle is already registered.
    #[error("handle already registered: {0}")]
    HandleTaken(String),

    /// The handle has never been registered.
    #[error("unknown handle: {0}")]
    UnknownHandle(String),

    /// The handle name is invalid.
    #[error("invalid handle {name:?}: {reason}")]
    InvalidHandle { name: String, reason: String },

    /// Failure reported by the registry backend.
    #[error("registry backend error: {0}")]
    Backend(String),
}

/// Convenience type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
