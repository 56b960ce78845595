//! Core types and the versioning algorithm for the Folio article store.
//!
//! No HTTP or database code lives here. Storage backends implement
//! [`adapter::StorageAdapter`]; the upsert algorithm in [`store`] is written
//! once against that trait, and [`pipeline`] strings the filter, gate, store
//! and sinks together.

// Traits use native `async fn` / `impl Future + Send` returns.
#![allow(async_fn_in_trait)]

pub mod adapter;
pub mod chain;
pub mod entry;
pub mod error;
pub mod filter;
pub mod gate;
pub mod locks;
pub mod memory;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod store;

pub use error::{Error, ErrorKind, Result, SinkError};
