//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use folio_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The store refused or failed to persist a submitted record.
  #[error("record not persisted ({0:?})")]
  NotPersisted(ErrorKind),

  #[error("store error: {0}")]
  Store(#[from] folio_core::Error),
}

fn unavailable(kind: ErrorKind) -> bool {
  matches!(kind, ErrorKind::Connectivity | ErrorKind::Timeout)
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::NotPersisted(kind) => match kind {
        ErrorKind::Connectivity | ErrorKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Consistency => StatusCode::CONFLICT,
        ErrorKind::Query => StatusCode::UNPROCESSABLE_ENTITY,
      },
      ApiError::Store(e) if unavailable(e.kind()) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
