//! [`MemorySink`]: collected results for an embedding caller.

use std::{
  collections::HashMap,
  sync::{Arc, PoisonError, RwLock},
};

use folio_core::{SinkError, record::Record, sink::Sink};

/// Keeps the latest record per URL in memory. Clones share the same map, so
/// the caller keeps one handle and gives another to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
  results: Arc<RwLock<HashMap<String, Record>>>,
}

impl MemorySink {
  pub fn new() -> Self { Self::default() }

  /// A snapshot of everything received so far.
  pub fn results(&self) -> HashMap<String, Record> {
    self.results.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  pub fn get(&self, url: &str) -> Option<Record> {
    self
      .results
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(url)
      .cloned()
  }

  pub fn len(&self) -> usize {
    self.results.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Sink for MemorySink {
  fn name(&self) -> &str { "memory" }

  async fn send(&self, record: &Record) -> Result<(), SinkError> {
    self
      .results
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(record.url.clone(), record.clone());
    Ok(())
  }
}
