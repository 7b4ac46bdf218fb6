use thiserror::Error;

use quill_store::StoreError;

/// Errors from container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A path segment could not be resolved to an existing tree entry while
    /// building an ancestry list.
    #[error("failed to find an ancestor for path: {path}")]
    AncestorNotFound { path: String },

    /// A batch write returned no wrapping root entry.
    #[error("blob store returned no root entry for the batch")]
    MissingRoot,

    /// A writable path is malformed.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Failure from the underlying blob store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for container operations.
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;
