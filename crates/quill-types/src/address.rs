use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AddressError, TypesResult};

/// Path separator used in generation-V3 addresses and container paths.
pub const SEPARATOR: char = '/';

/// Minimum length of a bare content address.
const MIN_BARE_LEN: usize = 6;

/// Opaque handle into the content-addressed blob store.
///
/// Equality of two addresses implies byte-identical content: addresses are
/// derived from the data they name, never assigned. An address is either a
/// bare store identifier (`"3f9a…"`) or a store identifier joined with a
/// relative path (`"3f9a…/block.json"`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Wrap a raw address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a relative path onto this address.
    ///
    /// Empty path segments are dropped, so `join("/content")` and
    /// `join("content")` produce the same address. Pure string operation,
    /// no I/O.
    pub fn join(&self, path: &str) -> ContentAddress {
        let mut joined = self.0.clone();
        for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
            joined.push(SEPARATOR);
            joined.push_str(segment);
        }
        ContentAddress(joined)
    }

    /// Classify this address into its wire-format generation.
    pub fn generation(&self) -> TypesResult<AddressGeneration> {
        AddressGeneration::classify(&self.0)
    }

    /// Abbreviated form for log output (first 8 characters).
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", self.0)
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl From<&str> for ContentAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

/// The three historical address wire formats.
///
/// Early feeds wrote bare store addresses (V1), then scheme-prefixed
/// addresses (V2); every new write uses container-relative addresses (V3).
/// Classification keeps all three generations readable without migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressGeneration {
    /// Bare content address, no prefix: `^[A-Za-z0-9]{6,}$`.
    V1,
    /// Scheme-prefixed address: `^[A-Za-z0-9]+://[A-Za-z0-9]{6,}$`.
    V2,
    /// `<root-address>/<relative-path>`: any remaining string with a `/`.
    V3,
}

impl AddressGeneration {
    /// Classify an address string into its generation.
    ///
    /// Total over the three patterns, tested in order V1, V2, V3; a string
    /// matching none of them is an [`AddressError::Unrecognized`] failure.
    pub fn classify(address: &str) -> TypesResult<AddressGeneration> {
        if is_bare(address) {
            return Ok(AddressGeneration::V1);
        }
        if is_scheme_prefixed(address) {
            return Ok(AddressGeneration::V2);
        }
        if address.contains(SEPARATOR) {
            return Ok(AddressGeneration::V3);
        }
        Err(AddressError::Unrecognized(address.to_string()))
    }
}

impl fmt::Display for AddressGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
            Self::V3 => write!(f, "v3"),
        }
    }
}

/// Strip a leading `<alnum>+://` scheme prefix, if present.
///
/// Addresses without a scheme prefix are returned unchanged.
pub fn strip_scheme(address: &str) -> &str {
    match address.split_once("://") {
        Some((scheme, rest))
            if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            rest
        }
        _ => address,
    }
}

fn is_bare(address: &str) -> bool {
    address.len() >= MIN_BARE_LEN && address.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_scheme_prefixed(address: &str) -> bool {
    match address.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric())
                && is_bare(rest)
        }
        None => false,
    }
}
