//! In-memory registry for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use quill_types::ContentAddress;

use crate::error::{RegistryError, RegistryResult};
use crate::handle::Handle;
use crate::traits::PointerRegistry;
use crate::types::{CommitCost, CommitReceipt};

/// One registered handle's slots.
#[derive(Clone, Debug, Default)]
struct HandleSlots {
    pointer: Option<ContentAddress>,
    profile: Option<ContentAddress>,
}

/// An in-memory implementation of [`PointerRegistry`].
///
/// All data lives in a `HashMap` behind a `RwLock`; commits are numbered by
/// a monotonic sequence counter. Data is lost when the registry is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    handles: RwLock<HashMap<Handle, HandleSlots>>,
    seq: RwLock<u64>,
}

impl InMemoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.handles.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no handle is registered.
    pub fn is_empty(&self) -> bool {
        self.handles.read().expect("lock poisoned").is_empty()
    }

    fn next_receipt(&self, handle: &Handle) -> CommitReceipt {
        let mut seq = self.seq.write().expect("lock poisoned");
        *seq += 1;
        CommitReceipt {
            handle: handle.clone(),
            seq: *seq,
        }
    }

    fn update_slot(
        &self,
        handle: &Handle,
        address: Option<&ContentAddress>,
        pick: impl FnOnce(&mut HandleSlots) -> &mut Option<ContentAddress>,
    ) -> RegistryResult<CommitReceipt> {
        let mut handles = self.handles.write().expect("lock poisoned");
        let slots = handles
            .get_mut(handle)
            .ok_or_else(|| RegistryError::UnknownHandle(handle.to_string()))?;
        *pick(slots) = address.cloned();
        drop(handles);
        Ok(self.next_receipt(handle))
    }
}

#[async_trait]
impl PointerRegistry for InMemoryRegistry {
    async fn register(&self, handle: &Handle) -> RegistryResult<CommitReceipt> {
        let mut handles = self.handles.write().expect("lock poisoned");
        if handles.contains_key(handle) {
            return Err(RegistryError::HandleTaken(handle.to_string()));
        }
        handles.insert(handle.clone(), HandleSlots::default());
        drop(handles);
        debug!(handle = %handle, "registered handle");
        Ok(self.next_receipt(handle))
    }

    async fn pointer(&self, handle: &Handle) -> RegistryResult<Option<ContentAddress>> {
        let handles = self.handles.read().expect("lock poisoned");
        Ok(handles.get(handle).and_then(|s| s.pointer.clone()))
    }

    async fn set_pointer(
        &self,
        handle: &Handle,
        address: Option<&ContentAddress>,
    ) -> RegistryResult<CommitReceipt> {
        let receipt = self.update_slot(handle, address, |s| &mut s.pointer)?;
        debug!(handle = %handle, seq = receipt.seq, "committed pointer");
        Ok(receipt)
    }

    async fn profile(&self, handle: &Handle) -> RegistryResult<Option<ContentAddress>> {
        let handles = self.handles.read().expect("lock poisoned");
        Ok(handles.get(handle).and_then(|s| s.profile.clone()))
    }

    async fn set_profile(
        &self,
        handle: &Handle,
        address: Option<&ContentAddress>,
    ) -> RegistryResult<CommitReceipt> {
        let receipt = self.update_slot(handle, address, |s| &mut s.profile)?;
        debug!(handle = %handle, seq = receipt.seq, "committed profile");
        Ok(receipt)
    }

    async fn estimate_set(
        &self,
        _handle: &Handle,
        _address: Option<&ContentAddress>,
    ) -> RegistryResult<CommitCost> {
        Ok(CommitCost::zero())
    }
}
