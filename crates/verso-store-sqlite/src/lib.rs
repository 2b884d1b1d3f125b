//! SQLite backend for Verso.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each bound entity gets a primary table
//! and a `<name>_versions` companion table.

mod collection;
mod encode;
mod schema;
mod storage;
mod store;

pub mod error;

pub use collection::SqliteCollection;
pub use error::{Error, Result};
pub use store::SqliteStore;
