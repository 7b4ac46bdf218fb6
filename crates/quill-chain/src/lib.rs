//! The Quill chain engine.
//!
//! A feed is a backward-linked sequence of immutable records: each record
//! names its predecessor by content address, and the head address is held in
//! an external handle registry. Because every node's address is a hash over
//! its own bytes — including the `previous` link — logically editing a node
//! means rewriting every newer node so its link points at the edited node's
//! new address. [`ChainEngine`] implements that ancestor rewrite, along with
//! append and full-chain load.
//!
//! # Key Types
//!
//! - [`Record`] — the chain payload serialized as `block.json`
//! - [`ChainNode`] — an addressed record with generation-aware resolution
//! - [`ChainEngine`] — append / replace / remove / load over one handle
//! - [`Task`] — two-phase estimate/execute envelope around registry commits

pub mod engine;
pub mod error;
pub mod node;
pub mod record;
pub mod task;

pub use engine::{AssetMap, Chain, ChainEngine, PROFILE_FILENAME};
pub use error::{ChainError, ChainResult};
pub use node::{ChainNode, ASSETS_DIR, CONTENT_FILENAME, RECORD_FILENAME};
pub use record::{Meta, Record, RecordPatch};
pub use task::{Task, TaskContext, TaskReport};
