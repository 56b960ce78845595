//! Error types for `folio-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The coarse class of a storage failure. This is all an
/// [`Outcome::Failed`](crate::entry::Outcome::Failed) carries upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// Storage unreachable; skip this record and keep crawling.
  Connectivity,
  /// Malformed statement, constraint violation or rejected write.
  Query,
  /// The current entry changed underneath the write.
  Consistency,
  /// The operation outlived its deadline and was rolled back.
  Timeout,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("storage unreachable: {0}")]
  Connectivity(#[source] BoxError),

  #[error("query failed: {0}")]
  Query(#[source] BoxError),

  #[error("conflicting concurrent write: {0}")]
  Consistency(String),

  #[error("invalid record: {0}")]
  InvalidRecord(String),

  #[error("operation cancelled before commit")]
  Cancelled,

  #[error("operation timed out")]
  Timeout,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn connectivity(err: impl Into<BoxError>) -> Self {
    Self::Connectivity(err.into())
  }

  pub fn query(err: impl Into<BoxError>) -> Self { Self::Query(err.into()) }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Connectivity(_) => ErrorKind::Connectivity,
      Self::Query(_) | Self::InvalidRecord(_) | Self::Serialization(_) => {
        ErrorKind::Query
      }
      Self::Consistency(_) => ErrorKind::Consistency,
      Self::Cancelled | Self::Timeout => ErrorKind::Timeout,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of a single fan-out sink. Never affects the stored history.
#[derive(Debug, Error)]
pub enum SinkError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("sink rejected record: {0}")]
  Rejected(String),
}
