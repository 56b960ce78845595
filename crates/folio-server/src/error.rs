//! Error type for `folio-server`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("storage error: {0}")]
  Store(#[from] folio_store_sqlite::Error),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("invalid setting `{setting}`: {reason}")]
  InvalidSetting {
    setting: &'static str,
    reason:  String,
  },

  #[error("ingest task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
