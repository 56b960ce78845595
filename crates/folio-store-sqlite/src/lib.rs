//! SQLite backend for the Folio article store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each upsert is one `BEGIN IMMEDIATE`
//! transaction, so several processes may share a database file.

mod adapter;
mod encode;
mod schema;

pub mod error;

pub use adapter::SqliteAdapter;
pub use error::{Error, Result};
