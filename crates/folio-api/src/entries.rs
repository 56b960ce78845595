//! Handlers for reading stored versions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/entries?url=` | The current entry; 404 if the URL was never stored |
//! | `GET`  | `/history?url=` | Every version, oldest first; empty if never stored |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use folio_core::{adapter::StorageAdapter, entry::Entry, pipeline::Pipeline, sink::Sink};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UrlParams {
  pub url: String,
}

impl UrlParams {
  pub(crate) fn checked(&self) -> Result<&str, ApiError> { checked_url(&self.url) }
}

/// Reject a blank `url`. Anything else is looked up exactly as given, the
/// same key the store was written under.
pub(crate) fn checked_url(url: &str) -> Result<&str, ApiError> {
  if url.trim().is_empty() {
    return Err(ApiError::BadRequest("`url` must not be empty".into()));
  }
  Ok(url)
}

/// `GET /entries?url=<url>`
pub async fn current<A, S>(
  State(pipeline): State<Arc<Pipeline<A, S>>>,
  Query(params): Query<UrlParams>,
) -> Result<Json<Entry>, ApiError>
where
  A: StorageAdapter,
  S: Sink,
{
  let url = params.checked()?;
  pipeline
    .store()
    .current(url)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("no entry for {url}")))
}

/// `GET /history?url=<url>`
pub async fn history<A, S>(
  State(pipeline): State<Arc<Pipeline<A, S>>>,
  Query(params): Query<UrlParams>,
) -> Result<Json<Vec<Entry>>, ApiError>
where
  A: StorageAdapter,
  S: Sink,
{
  let url = params.checked()?;
  Ok(Json(pipeline.store().history(url).await?))
}
