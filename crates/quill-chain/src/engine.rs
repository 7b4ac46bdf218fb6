use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use quill_container::{Container, ContainerWritable, WritableContent};
use quill_registry::{CommitCost, CommitReceipt, Handle, PointerRegistry};
use quill_store::BlobStore;
use quill_types::{ContentAddress, SEPARATOR};

use crate::error::{ChainError, ChainResult};
use crate::node::{ChainNode, ASSETS_DIR};
use crate::record::{Meta, Record, RecordPatch};
use crate::task::{BoxFuture, Task};

/// Fixed path of a handle's profile document inside its container.
pub const PROFILE_FILENAME: &str = "profile.json";

/// Stand-in address used to estimate a commit before the real address exists.
const ESTIMATE_PLACEHOLDER: &str =
    "e5d1a7c40000000000000000000000000000000000000000000000000000babe/estimate.json";

/// A loaded feed: chain nodes ordered newest-first.
pub type Chain = Vec<ChainNode>;

/// Auxiliary assets attached to a record: name → existing blob address.
pub type AssetMap = BTreeMap<String, ContentAddress>;

/// The per-handle chain orchestrator.
///
/// One engine serves any number of handles; operations on distinct handles
/// are independent. Within one handle the engine does not serialize
/// concurrent mutations — overlapping writers race on the registry's
/// last-write-wins pointer slot, and the loser's nodes become unreferenced
/// blob-store garbage. Callers needing exclusivity must serialize per handle
/// themselves.
///
/// Every operation is atomic from the caller's perspective: the registry
/// commit is the final step and the sole observable state transition, so a
/// failure at any earlier point leaves the previous head intact and the
/// partially written nodes inert.
#[derive(Clone)]
pub struct ChainEngine {
    blobs: Arc<dyn BlobStore>,
    registry: Arc<dyn PointerRegistry>,
}

enum Modification {
    Replace {
        content: WritableContent,
        meta: Meta,
        assets: AssetMap,
    },
    Remove,
}

impl ChainEngine {
    /// Create an engine over already-constructed store and registry clients.
    pub fn new(blobs: Arc<dyn BlobStore>, registry: Arc<dyn PointerRegistry>) -> Self {
        Self { blobs, registry }
    }

    /// Claim a handle in the registry.
    pub fn register(&self, handle: &Handle) -> Task<CommitReceipt> {
        let registry = Arc::clone(&self.registry);
        let handle = handle.clone();
        Task::new(self.estimate_commit(&handle), move |mut ctx| async move {
            let receipt = registry.register(&handle).await?;
            ctx.commit = Some(receipt.clone());
            info!(handle = %handle, "registered handle");
            Ok((receipt, ctx))
        })
    }

    /// Load the full chain behind a handle, newest-first.
    ///
    /// An empty pointer yields an empty chain. The walk follows `previous`
    /// links until the earliest record; it does not detect cycles or enforce
    /// uuid uniqueness — malformed external data with a cyclic `previous`
    /// link will not terminate.
    pub fn load(&self, handle: &Handle) -> Task<Chain> {
        let blobs = Arc::clone(&self.blobs);
        self.pointer_task(handle).and_then(move |head, ctx| async move {
            let chain = walk_chain(blobs.as_ref(), head).await?;
            Ok((chain, ctx))
        })
    }

    /// Append a record to a handle's chain.
    ///
    /// The new record links to the current head, gets materialized together
    /// with its content and assets in a fresh container, and becomes the new
    /// head on commit.
    pub fn push(
        &self,
        handle: &Handle,
        content: WritableContent,
        meta: Meta,
        assets: AssetMap,
    ) -> Task<ChainNode> {
        let blobs = Arc::clone(&self.blobs);
        let registry = Arc::clone(&self.registry);
        let estimate = self.estimate_commit(handle);
        let handle = handle.clone();
        Task::new(estimate, move |mut ctx| async move {
            let previous = registry.pointer(&handle).await?;
            let record = Record::new(content.path.clone(), meta, previous);
            let mut files = asset_writables(assets);
            files.push(ContainerWritable::Content(content));
            let node = ChainNode::create(blobs.as_ref(), record, files).await?;
            ctx.commit = Some(registry.set_pointer(&handle, Some(node.address())).await?);
            info!(handle = %handle, address = %node.address().short(), "pushed record");
            Ok((node, ctx))
        })
    }

    /// Replace the record with the given uuid in place, rewriting every
    /// newer record so its `previous` link follows the replacement.
    pub fn replace(
        &self,
        handle: &Handle,
        uuid: Uuid,
        content: WritableContent,
        meta: Meta,
        assets: AssetMap,
    ) -> Task<Chain> {
        self.modify(
            handle,
            uuid,
            Modification::Replace {
                content,
                meta,
                assets,
            },
        )
    }

    /// Splice the record with the given uuid out of the chain, relinking
    /// every newer record past it.
    pub fn remove(&self, handle: &Handle, uuid: Uuid) -> Task<Chain> {
        self.modify(handle, uuid, Modification::Remove)
    }

    /// Write a handle's profile document and commit its address.
    pub fn update_profile(
        &self,
        handle: &Handle,
        profile: serde_json::Value,
        assets: AssetMap,
    ) -> Task<ContentAddress> {
        let blobs = Arc::clone(&self.blobs);
        let registry = Arc::clone(&self.registry);
        let estimate = self.estimate_commit(handle);
        let handle = handle.clone();
        Task::new(estimate, move |mut ctx| async move {
            let bytes = serde_json::to_vec(&profile)
                .map_err(|e| ChainError::Serialization(e.to_string()))?;
            let mut files = asset_writables(assets);
            files.push(ContainerWritable::content(PROFILE_FILENAME, bytes));
            let container = Container::create(blobs.as_ref(), files).await?;
            let address = container.resolve(PROFILE_FILENAME);
            ctx.commit = Some(registry.set_profile(&handle, Some(&address)).await?);
            info!(handle = %handle, address = %address.short(), "updated profile");
            Ok((address, ctx))
        })
    }

    /// Read a handle's profile document, if one is set.
    pub fn profile(&self, handle: &Handle) -> Task<Option<serde_json::Value>> {
        let blobs = Arc::clone(&self.blobs);
        let registry = Arc::clone(&self.registry);
        let handle = handle.clone();
        let base = Task::new(Self::free_estimate(), move |ctx| async move {
            Ok((registry.profile(&handle).await?, ctx))
        });
        base.and_then(move |address, ctx| async move {
            let Some(address) = address else {
                return Ok((None, ctx));
            };
            let bytes = blobs.get(&address).await?;
            let profile = serde_json::from_slice(&bytes)
                .map_err(|e| ChainError::Serialization(e.to_string()))?;
            Ok((Some(profile), ctx))
        })
    }

    /// The shared ancestor-rewrite core behind replace and remove.
    ///
    /// Scans newest-to-oldest for the first uuid match, produces the
    /// replacement (or skips it for removal), then rewrites the newer
    /// records oldest-to-newest so each one's `previous` points at the
    /// freshly written address below it. The registry commit happens last.
    fn modify(&self, handle: &Handle, uuid: Uuid, modification: Modification) -> Task<Chain> {
        let blobs = Arc::clone(&self.blobs);
        let registry = Arc::clone(&self.registry);
        let estimate = self.estimate_commit(handle);
        let handle = handle.clone();
        Task::new(estimate, move |mut ctx| async move {
            let head = registry.pointer(&handle).await?;
            let chain = walk_chain(blobs.as_ref(), head).await?;

            // Split: nodes newer than the target get rewritten, nodes older
            // are re-attached untouched.
            let mut rewrite: Vec<ChainNode> = Vec::new();
            let mut kept: Vec<ChainNode> = Vec::new();
            let mut target: Option<ChainNode> = None;
            for node in chain {
                if target.is_some() {
                    kept.push(node);
                } else if node.record().uuid == uuid {
                    target = Some(node);
                } else {
                    rewrite.push(node);
                }
            }
            let target = target.ok_or_else(|| ChainError::HandleNotModified {
                handle: handle.clone(),
            })?;

            let mut pointer = target.record().previous.clone();
            let mut rebuilt: Vec<ChainNode> = Vec::new();
            if let Modification::Replace {
                content,
                meta,
                assets,
            } = modification
            {
                let patch = RecordPatch::content(content.path.clone(), meta);
                let mut files = asset_writables(assets);
                files.push(ContainerWritable::Content(content));
                let replacement = target.patch(blobs.as_ref(), patch, files).await?;
                pointer = Some(replacement.address().clone());
                rebuilt.push(replacement);
            }

            // Oldest-to-newest: each rewrite feeds the next node's link.
            while let Some(node) = rewrite.pop() {
                let relinked = node
                    .patch(blobs.as_ref(), RecordPatch::relink(pointer.clone()), vec![])
                    .await?;
                pointer = Some(relinked.address().clone());
                rebuilt.insert(0, relinked);
            }

            ctx.commit = Some(registry.set_pointer(&handle, pointer.as_ref()).await?);
            debug!(
                handle = %handle,
                rewritten = rebuilt.len(),
                untouched = kept.len(),
                "rewrote chain"
            );
            rebuilt.extend(kept);
            Ok((rebuilt, ctx))
        })
    }

    /// Raw pointer read as a task; chain interpretation layers on top.
    fn pointer_task(&self, handle: &Handle) -> Task<Option<ContentAddress>> {
        let registry = Arc::clone(&self.registry);
        let handle = handle.clone();
        Task::new(Self::free_estimate(), move |ctx| async move {
            Ok((registry.pointer(&handle).await?, ctx))
        })
    }

    fn estimate_commit(
        &self,
        handle: &Handle,
    ) -> impl Fn() -> BoxFuture<'static, ChainResult<CommitCost>> + Send + 'static {
        let registry = Arc::clone(&self.registry);
        let handle = handle.clone();
        move || -> BoxFuture<'static, ChainResult<CommitCost>> {
            let registry = Arc::clone(&registry);
            let handle = handle.clone();
            Box::pin(async move {
                let placeholder = ContentAddress::from(ESTIMATE_PLACEHOLDER);
                Ok(registry.estimate_set(&handle, Some(&placeholder)).await?)
            })
        }
    }

    fn free_estimate() -> impl Fn() -> BoxFuture<'static, ChainResult<CommitCost>> + Send + 'static
    {
        || -> BoxFuture<'static, ChainResult<CommitCost>> {
            Box::pin(async { Ok(CommitCost::zero()) })
        }
    }
}

impl std::fmt::Debug for ChainEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainEngine").finish_non_exhaustive()
    }
}

/// Follow `previous` links from a head address to the chain's earliest
/// record.
async fn walk_chain(blobs: &dyn BlobStore, head: Option<ContentAddress>) -> ChainResult<Chain> {
    let mut chain = Chain::new();
    let mut cursor = head;
    while let Some(address) = cursor {
        let node = ChainNode::load(blobs, &address).await?;
        cursor = node.record().previous.clone();
        chain.push(node);
    }
    Ok(chain)
}

fn asset_writables(assets: AssetMap) -> Vec<ContainerWritable> {
    assets
        .into_iter()
        .map(|(name, address)| {
            ContainerWritable::link(format!("{ASSETS_DIR}{SEPARATOR}{name}"), address)
        })
        .collect()
}
