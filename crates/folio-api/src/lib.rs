//! JSON REST API for Folio.
//!
//! Exposes an axum [`Router`] over a [`Pipeline`]: records go in through the
//! same filter, gate and store a crawler would use, and version history comes
//! back out. Auth, TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", folio_api::api_router(pipeline.clone()))
//! ```

pub mod entries;
pub mod error;
pub mod freshness;
pub mod records;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use folio_core::{adapter::StorageAdapter, pipeline::Pipeline, sink::Sink};

pub use error::ApiError;

/// Build the API router for `pipeline`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<A, S>(pipeline: Arc<Pipeline<A, S>>) -> Router<()>
where
  A: StorageAdapter,
  S: Sink + 'static,
{
  Router::new()
    .route("/records", post(records::create::<A, S>))
    .route("/entries", get(entries::current::<A, S>))
    .route("/history", get(entries::history::<A, S>))
    .route("/freshness", get(freshness::check::<A, S>))
    .with_state(pipeline)
}

#[cfg(test)]
mod tests;
