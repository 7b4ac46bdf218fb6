use async_trait::async_trait;

use quill_types::ContentAddress;

use crate::error::StoreResult;
use crate::node::{BlobRef, BlobUpload, DagLink};

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - Nodes are immutable once written; the same bytes always produce the
///   same address, so writes are idempotent.
/// - Addresses may carry a path suffix (`<node>/<segment>/…`); reads resolve
///   each segment through named edges.
/// - All I/O errors are propagated, never silently ignored; the store adds
///   no retry logic.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Batch-write leaf content, wrapping the batch in a directory node.
    ///
    /// Nested paths create intermediate directory nodes. The result contains
    /// one reference per written path (leaves and directories) plus a
    /// reference with `path == ""` for the wrapping root — also for an empty
    /// batch, which yields just the empty root.
    async fn add(&self, entries: Vec<BlobUpload>) -> StoreResult<Vec<BlobRef>>;

    /// Read raw content at an address.
    ///
    /// For a directory address the first child's content is returned; legacy
    /// chain generations rely on this read mode.
    async fn get(&self, address: &ContentAddress) -> StoreResult<Vec<u8>>;

    /// Enumerate one node's named edges.
    async fn list_children(&self, address: &ContentAddress) -> StoreResult<Vec<DagLink>>;

    /// Attach or replace one named edge on a node, returning the new node's
    /// address. The original node remains readable at its old address.
    async fn patch_link(
        &self,
        node: &ContentAddress,
        name: &str,
        target: &ContentAddress,
    ) -> StoreResult<ContentAddress>;
}
