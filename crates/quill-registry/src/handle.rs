//! Handle name validation.
//!
//! Valid handles:
//! - Must be non-empty and at most 32 bytes (registries pack handles into
//!   fixed-width keys)
//! - Lowercase ASCII letters, digits, and `-` only
//! - Must not start or end with `-`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Maximum handle length in bytes.
pub const MAX_HANDLE_LEN: usize = 32;

/// A validated feed handle: the external stable name that resolves, via the
/// registry, to a chain's current head address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Validate and wrap a handle name.
    pub fn new(name: impl Into<String>) -> RegistryResult<Self> {
        let name = name.into();
        validate_handle_name(&name)?;
        Ok(Self(name))
    }

    /// The raw handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Handle {
    type Error = RegistryError;

    fn try_from(name: String) -> RegistryResult<Self> {
        Handle::new(name)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

/// Validate a handle name, returning `Ok(())` if valid.
pub fn validate_handle_name(name: &str) -> RegistryResult<()> {
    let invalid = |reason: &str| RegistryError::InvalidHandle {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("handle must not be empty"));
    }
    if name.len() > MAX_HANDLE_LEN {
        return Err(invalid("handle must be at most 32 bytes"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "handle may contain only lowercase letters, digits, and '-'",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("handle must not start or end with '-'"));
    }

    Ok(())
}
