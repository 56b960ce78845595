//! Error type for `folio-store-sqlite`, and its mapping onto the core error
//! taxonomy.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row that the schema should have made impossible.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for folio_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Database(e) => from_connection(e),
      Error::Sqlite(e) => classify(e),
      Error::Json(e) => folio_core::Error::Serialization(e),
      Error::DateParse(_) | Error::Corrupt(_) => folio_core::Error::query(err),
    }
  }
}

fn from_connection(err: tokio_rusqlite::Error) -> folio_core::Error {
  match err {
    tokio_rusqlite::Error::ConnectionClosed => {
      folio_core::Error::connectivity("database connection closed")
    }
    tokio_rusqlite::Error::Close((_, e)) => folio_core::Error::connectivity(e),
    tokio_rusqlite::Error::Rusqlite(e) => classify(e),
    tokio_rusqlite::Error::Other(e) => folio_core::Error::Query(e),
    #[allow(unreachable_patterns)]
    other => folio_core::Error::query(other.to_string()),
  }
}

/// Sort a SQLite failure into the core error kinds by its result code.
pub(crate) fn classify(err: rusqlite::Error) -> folio_core::Error {
  match err.sqlite_error_code() {
    // Another writer held the lock past the busy timeout.
    Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
      folio_core::Error::Consistency(err.to_string())
    }
    Some(
      ErrorCode::CannotOpen
      | ErrorCode::SystemIoFailure
      | ErrorCode::NotADatabase
      | ErrorCode::PermissionDenied
      | ErrorCode::DiskFull,
    ) => folio_core::Error::connectivity(err),
    _ => folio_core::Error::query(err),
  }
}

/// A UNIQUE constraint failed. Other constraint failures (NOT NULL, CHECK,
/// triggers) are not conflicts.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(failure, _)
      if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}
