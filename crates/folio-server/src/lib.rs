//! Configuration and wiring for the `folio` binary.
//!
//! Turns a [`ServerConfig`] into a ready [`Pipeline`] backed by SQLite and the
//! configured sinks, and exposes it over HTTP or feeds it from a JSON Lines
//! file.

pub mod error;
pub mod ingest;

pub use error::{Error, Result};

use std::{path::{Path, PathBuf}, sync::Arc, time::Duration};

use axum::Router;
use chrono::TimeDelta;
use folio_core::{
  adapter::StorageAdapter,
  filter::PublishDateFilter,
  gate::{GateConfig, GateMode},
  pipeline::Pipeline,
  sink::{FanOut, Sink},
  store::{StoreConfig, UnchangedPolicy, VersionStore},
};
use folio_sinks::{ConfiguredSink, SinkConfig};
use folio_store_sqlite::SqliteAdapter;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `FOLIO_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_store_path")]
  pub store_path:  PathBuf,
  #[serde(default = "default_host")]
  pub host:        String,
  #[serde(default = "default_port")]
  pub port:        u16,
  /// Records processed at once by `ingest`.
  #[serde(default = "default_concurrency")]
  pub concurrency: usize,
  #[serde(default)]
  pub gate:        GateSettings,
  #[serde(default)]
  pub store:       StoreSettings,
  pub filter:      Option<PublishDateFilter>,
  #[serde(default)]
  pub sinks:       Vec<SinkConfig>,
}

fn default_store_path() -> PathBuf { PathBuf::from("folio.db") }
fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8090 }
fn default_concurrency() -> usize { 16 }

#[derive(Debug, Deserialize, Clone)]
pub struct GateSettings {
  #[serde(default = "default_min_revisit_hours")]
  pub min_revisit_hours: u64,
  #[serde(default)]
  pub mode:              GateMode,
}

fn default_min_revisit_hours() -> u64 { 24 }

impl Default for GateSettings {
  fn default() -> Self {
    Self {
      min_revisit_hours: default_min_revisit_hours(),
      mode:              GateMode::default(),
    }
  }
}

impl GateSettings {
  pub fn gate_config(&self) -> Result<GateConfig> {
    let min_revisit_interval = i64::try_from(self.min_revisit_hours)
      .ok()
      .and_then(TimeDelta::try_hours)
      .ok_or_else(|| Error::InvalidSetting {
        setting: "gate.min_revisit_hours",
        reason:  format!("{} hours is out of range", self.min_revisit_hours),
      })?;
    Ok(GateConfig { min_revisit_interval, mode: self.mode })
  }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
  #[serde(default)]
  pub unchanged:     UnchangedPolicy,
  #[serde(default = "default_op_timeout_ms")]
  pub op_timeout_ms: u64,
}

fn default_op_timeout_ms() -> u64 { 5_000 }

impl Default for StoreSettings {
  fn default() -> Self {
    Self {
      unchanged:     UnchangedPolicy::default(),
      op_timeout_ms: default_op_timeout_ms(),
    }
  }
}

impl StoreSettings {
  pub fn store_config(&self) -> Result<StoreConfig> {
    if self.op_timeout_ms == 0 {
      return Err(Error::InvalidSetting {
        setting: "store.op_timeout_ms",
        reason:  "must be greater than zero".into(),
      });
    }
    Ok(StoreConfig {
      unchanged:  self.unchanged,
      op_timeout: Duration::from_millis(self.op_timeout_ms),
    })
  }
}

/// Read `path` (if it exists) and overlay `FOLIO_*` environment variables,
/// with `__` separating nested keys (`FOLIO_GATE__MODE=request`).
pub fn load_config(path: &Path) -> Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("FOLIO")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?;
  Ok(settings.try_deserialize()?)
}

// ─── Assembly ────────────────────────────────────────────────────────────────

pub type FolioPipeline = Pipeline<SqliteAdapter, ConfiguredSink>;

/// Build a pipeline over `adapter` as `config` describes.
pub fn assemble<A: StorageAdapter>(
  adapter: Arc<A>,
  config: &ServerConfig,
) -> Result<Pipeline<A, ConfiguredSink>> {
  let store = VersionStore::new(adapter, config.store.store_config()?);
  let sinks = config.sinks.iter().map(SinkConfig::build).collect();
  let pipeline = Pipeline::new(
    Arc::new(store),
    config.gate.gate_config()?,
    FanOut::new(sinks),
  );
  Ok(match &config.filter {
    Some(filter) => pipeline.with_filter(filter.clone()),
    None => pipeline,
  })
}

/// Open the SQLite database at `store_path` and assemble a pipeline over it.
pub async fn open_pipeline(
  config: &ServerConfig,
  store_path: &Path,
) -> Result<Arc<FolioPipeline>> {
  let adapter = SqliteAdapter::open(store_path).await?;
  Ok(Arc::new(assemble(Arc::new(adapter), config)?))
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The API under `/api`, with request tracing.
pub fn router<A, S>(pipeline: Arc<Pipeline<A, S>>) -> Router
where
  A: StorageAdapter,
  S: Sink + 'static,
{
  Router::new()
    .nest("/api", folio_api::api_router(pipeline))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;
