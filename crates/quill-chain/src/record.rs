use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use quill_types::ContentAddress;

use crate::error::{ChainError, ChainResult};

/// Caller-supplied metadata attached to a record.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// The chain payload, serialized as JSON into `block.json`.
///
/// `uuid` is unique within a chain by caller discipline — the store does not
/// enforce it, and with duplicates only the newest match is addressable by
/// mutation operations. `previous` is `None` only for the chain's earliest
/// record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Chain-unique record identifier.
    pub uuid: Uuid,
    /// Where the record's primary content lives. Generation-dependent: a
    /// bare or scheme-prefixed store address for legacy records, a
    /// container-relative path for current ones. May be empty.
    pub address: String,
    /// Caller metadata, carried opaquely.
    #[serde(default)]
    pub meta: Meta,
    /// Milliseconds since the epoch, assigned at creation.
    pub timestamp: i64,
    /// Address of the predecessor record. Legacy chains encode "none" as a
    /// missing field, `null`, or an empty string; all read as `None`.
    #[serde(default, deserialize_with = "deserialize_previous")]
    pub previous: Option<ContentAddress>,
}

impl Record {
    /// Create a record with a fresh uuid and the current timestamp.
    pub fn new(address: impl Into<String>, meta: Meta, previous: Option<ContentAddress>) -> Self {
        Self {
            uuid: Uuid::now_v7(),
            address: address.into(),
            meta,
            timestamp: chrono::Utc::now().timestamp_millis(),
            previous,
        }
    }

    /// Serialize to the `block.json` wire form.
    pub fn to_bytes(&self) -> ChainResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ChainError::Serialization(e.to_string()))
    }

    /// Deserialize from the `block.json` wire form.
    pub fn from_bytes(bytes: &[u8]) -> ChainResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ChainError::Serialization(e.to_string()))
    }

    /// Apply a partial update, leaving untouched fields as they are.
    pub fn patched(&self, patch: RecordPatch) -> Record {
        let mut record = self.clone();
        if let Some(address) = patch.address {
            record.address = address;
        }
        if let Some(meta) = patch.meta {
            record.meta = meta;
        }
        if let Some(previous) = patch.previous {
            record.previous = previous;
        }
        record
    }
}

/// A partial record update.
///
/// `uuid` and `timestamp` are never patched: the identity and creation time
/// of a record survive every rewrite.
#[derive(Clone, Debug, Default)]
pub struct RecordPatch {
    /// Replacement content location.
    pub address: Option<String>,
    /// Replacement metadata.
    pub meta: Option<Meta>,
    /// Replacement predecessor link (outer `Some` means "set it").
    pub previous: Option<Option<ContentAddress>>,
}

impl RecordPatch {
    /// Patch for a content replacement: new content location and metadata.
    pub fn content(address: impl Into<String>, meta: Meta) -> Self {
        Self {
            address: Some(address.into()),
            meta: Some(meta),
            previous: None,
        }
    }

    /// Patch for an ancestor rewrite: only the predecessor link changes.
    pub fn relink(previous: Option<ContentAddress>) -> Self {
        Self {
            address: None,
            meta: None,
            previous: Some(previous),
        }
    }
}

fn deserialize_previous<'de, D>(deserializer: D) -> Result<Option<ContentAddress>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(ContentAddress::from))
}
