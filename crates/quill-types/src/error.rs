//! Error types for address handling.

use thiserror::Error;

/// Errors that can occur while interpreting addresses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The address matches none of the known wire-format generations.
    #[error("unrecognized address: {0}")]
    Unrecognized(String),
}

/// Convenience type alias for address operations.
pub type TypesResult<T> = std::result::Result<T, AddressError>;
