//! Core types and the version-chain engine for Verso.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`mapper::RecordStorage`] for their own transaction type
//! and let [`mapper::VersionedMapper`] drive every mutation, so the version
//! chain can only be written through the engine.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod chain;
pub mod clock;
pub mod error;
pub mod mapper;
pub mod revert;
pub mod schema;
pub mod store;
pub mod value;
pub mod version;

#[cfg(test)]
mod testing;

pub use error::{AsCoreError, Error, Result};
