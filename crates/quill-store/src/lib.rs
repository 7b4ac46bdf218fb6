//! Content-addressed blob storage for Quill.
//!
//! The blob store is an external collaborator: Quill consumes the
//! [`BlobStore`] trait and never depends on a concrete backend. This crate
//! also ships [`InMemoryBlobStore`], a DAG-shaped in-memory backend used by
//! tests and embedders.
//!
//! All backends must satisfy the same invariants:
//! - Nodes are immutable once written; identical bytes always produce the
//!   identical address.
//! - "Patching" a node writes a new node and returns its new address; the
//!   old node remains readable.
//! - The store never interprets leaf contents.

pub mod error;
pub mod hasher;
pub mod memory;
pub mod node;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use hasher::ContentHasher;
pub use memory::InMemoryBlobStore;
pub use node::{BlobRef, BlobUpload, DagLink, DagNode};
pub use traits::BlobStore;
