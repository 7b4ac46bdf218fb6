use async_trait::async_trait;

use quill_types::ContentAddress;

use crate::error::RegistryResult;
use crate::handle::Handle;
use crate::types::{CommitCost, CommitReceipt};

/// External pointer store for feed handles.
///
/// Each registered handle owns two independent, last-write-wins slots: the
/// head **pointer** of its chain and the address of its **profile**
/// document. Writes are atomic per slot; the registry provides no
/// cross-slot transactions and no serialization of concurrent writers —
/// the last commit wins, and the loser's writes become unreferenced
/// blob-store garbage, not an error.
///
/// Ownership checks (who may write a handle's slots) are the backend's
/// responsibility and are out of scope here.
#[async_trait]
pub trait PointerRegistry: Send + Sync {
    /// Claim a handle. Fails with `HandleTaken` if it is already registered.
    async fn register(&self, handle: &Handle) -> RegistryResult<CommitReceipt>;

    /// Read a handle's head pointer. `None` means no chain yet; unregistered
    /// handles also read as `None`.
    async fn pointer(&self, handle: &Handle) -> RegistryResult<Option<ContentAddress>>;

    /// Commit a handle's head pointer; `None` clears the slot.
    ///
    /// Fails with `UnknownHandle` if the handle was never registered.
    async fn set_pointer(
        &self,
        handle: &Handle,
        address: Option<&ContentAddress>,
    ) -> RegistryResult<CommitReceipt>;

    /// Read a handle's profile address.
    async fn profile(&self, handle: &Handle) -> RegistryResult<Option<ContentAddress>>;

    /// Commit a handle's profile address; `None` clears the slot.
    async fn set_profile(
        &self,
        handle: &Handle,
        address: Option<&ContentAddress>,
    ) -> RegistryResult<CommitReceipt>;

    /// Estimate the cost of committing a slot write, without side effects.
    async fn estimate_set(
        &self,
        handle: &Handle,
        address: Option<&ContentAddress>,
    ) -> RegistryResult<CommitCost>;
}
