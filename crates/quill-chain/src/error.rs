use thiserror::Error;

use quill_container::ContainerError;
use quill_registry::{Handle, RegistryError};
use quill_store::StoreError;
use quill_types::{AddressError, ContentAddress};

/// Errors from chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A replace/remove target uuid is absent from the chain.
    #[error("handle {handle} does not need modification")]
    HandleNotModified { handle: Handle },

    /// The node belongs to a generation without a container.
    #[error("no container behind node at {address}")]
    MissingContainer { address: ContentAddress },

    /// Record serialization or deserialization failure.
    #[error("record serialization error: {0}")]
    Serialization(String),

    /// An address could not be classified.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Failure from the blob store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failure from the handle registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Failure from the container layer.
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Convenience type alias for chain operations.
pub type ChainResult<T> = std::result::Result<T, ChainError>;
