//! Handler for `GET /freshness?url=<url>[&at=<rfc3339>]`.
//!
//! Asks the freshness gate whether `url` may be crawled again at `at`
//! (default: now), regardless of the stage the gate is configured for.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{DateTime, Utc};
use folio_core::{adapter::StorageAdapter, gate::Verdict, pipeline::Pipeline, sink::Sink};
use serde::{Deserialize, Serialize};

use crate::{entries::checked_url, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FreshnessParams {
  pub url: String,
  pub at:  Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FreshnessBody {
  pub url:     String,
  pub at:      DateTime<Utc>,
  pub verdict: Verdict,
}

/// `GET /freshness?url=<url>[&at=<rfc3339>]`
pub async fn check<A, S>(
  State(pipeline): State<Arc<Pipeline<A, S>>>,
  Query(params): Query<FreshnessParams>,
) -> Result<Json<FreshnessBody>, ApiError>
where
  A: StorageAdapter,
  S: Sink,
{
  let url = checked_url(&params.url)?;
  let at = params.at.unwrap_or_else(Utc::now);
  let verdict = pipeline.gate().check(url, at).await?;
  Ok(Json(FreshnessBody { url: url.to_owned(), at, verdict }))
}
