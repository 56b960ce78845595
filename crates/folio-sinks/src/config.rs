//! Sink selection from configuration.

use std::path::PathBuf;

use folio_core::{SinkError, record::Record, sink::Sink};
use serde::{Deserialize, Serialize};

use crate::{JsonFileSink, JsonLinesSink, MemorySink};

/// One `[[sinks]]` table in the server configuration.
///
/// ```toml
/// [[sinks]]
/// kind = "json_file"
/// dir  = "articles"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
  JsonFile { dir: PathBuf },
  JsonLines { path: PathBuf },
  Memory,
}

impl SinkConfig {
  pub fn build(&self) -> ConfiguredSink {
    match self {
      Self::JsonFile { dir } => ConfiguredSink::JsonFile(JsonFileSink::new(dir)),
      Self::JsonLines { path } => ConfiguredSink::JsonLines(JsonLinesSink::new(path)),
      Self::Memory => ConfiguredSink::Memory(MemorySink::new()),
    }
  }
}

/// Any of the sinks this crate provides, behind one type so a fan-out can
/// hold a mix of them.
#[derive(Debug)]
pub enum ConfiguredSink {
  JsonFile(JsonFileSink),
  JsonLines(JsonLinesSink),
  Memory(MemorySink),
}

impl From<MemorySink> for ConfiguredSink {
  fn from(sink: MemorySink) -> Self { Self::Memory(sink) }
}

impl Sink for ConfiguredSink {
  fn name(&self) -> &str {
    match self {
      Self::JsonFile(s) => s.name(),
      Self::JsonLines(s) => s.name(),
      Self::Memory(s) => s.name(),
    }
  }

  async fn send(&self, record: &Record) -> Result<(), SinkError> {
    match self {
      Self::JsonFile(s) => s.send(record).await,
      Self::JsonLines(s) => s.send(record).await,
      Self::Memory(s) => s.send(record).await,
    }
  }
}
