//! Foundation types for Quill.
//!
//! This crate provides the content-address types shared by every other Quill
//! crate. It performs no I/O.
//!
//! # Key Types
//!
//! - [`ContentAddress`] — Opaque handle into the content-addressed blob store
//! - [`AddressGeneration`] — The three historical address wire formats
//! - [`AddressError`] — Classification failures

pub mod address;
pub mod error;

pub use address::{strip_scheme, AddressGeneration, ContentAddress, SEPARATOR};
pub use error::{AddressError, TypesResult};
