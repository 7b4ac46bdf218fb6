//! Handle registry for Quill.
//!
//! The registry is the external pointer store: a named, last-write-wins slot
//! per handle holding the feed's head address, plus a second slot for the
//! handle's profile document. Quill consumes the [`PointerRegistry`] trait;
//! real deployments back it with a transactional system (the original runs
//! on a smart contract), while [`InMemoryRegistry`] serves tests and
//! embedding.
//!
//! Ownership and access control are enforced by the backend, not here:
//! concurrent writers race and the last commit wins.

pub mod error;
pub mod handle;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{RegistryError, RegistryResult};
pub use handle::Handle;
pub use memory::InMemoryRegistry;
pub use traits::PointerRegistry;
pub use types::{CommitCost, CommitReceipt};
