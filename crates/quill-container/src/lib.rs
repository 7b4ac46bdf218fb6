//! Container trees for Quill.
//!
//! A container is a content-addressed tree of named entries — the directory
//! object a feed record lives in. Because every node's address is a hash of
//! its own bytes, editing any entry forces recomputation of every address on
//! the path from that entry to the root, and only that path. [`Container`]
//! implements exactly that minimal recomputation.
//!
//! # Key Types
//!
//! - [`Container`] — a loaded tree: root address plus every reachable entry
//! - [`ContainerWritable`] — new leaf bytes, or an existing address attached
//!   by reference
//! - [`ContainerError`] — patching and traversal failures

pub mod container;
pub mod error;
pub mod writable;

pub use container::{Container, ContainerEntry, DEFAULT_MAX_DEPTH};
pub use error::{ContainerError, ContainerResult};
pub use writable::{ContainerWritable, WritableContent, WritableLink};
