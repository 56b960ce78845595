//! Handler for `POST /records`.
//!
//! The body is a [`Record`]. The response body is the
//! [`Disposition`](folio_core::pipeline::Disposition):
//!
//! | Result | Status |
//! |--------|--------|
//! | first version stored | 201 |
//! | promoted, unchanged, filtered or suppressed | 200 |
//! | storage unreachable or timed out | 503 |
//! | conflicting concurrent write | 409 |
//! | rejected record or failed query | 422 |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use folio_core::{
  adapter::StorageAdapter,
  entry::Outcome,
  pipeline::{Disposition, Pipeline},
  record::Record,
  sink::Sink,
};

use crate::error::ApiError;

/// `POST /records`
pub async fn create<A, S>(
  State(pipeline): State<Arc<Pipeline<A, S>>>,
  Json(record): Json<Record>,
) -> Result<impl IntoResponse, ApiError>
where
  A: StorageAdapter,
  S: Sink,
{
  let disposition = pipeline.process(record).await;
  let status = match disposition {
    Disposition::Stored { outcome: Outcome::Failed { kind } } => {
      return Err(ApiError::NotPersisted(kind));
    }
    Disposition::Stored { outcome: Outcome::Created { .. } } => StatusCode::CREATED,
    _ => StatusCode::OK,
  };
  Ok((status, Json(disposition)))
}
