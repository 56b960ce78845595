//! The sink capability and best-effort fan-out.
//!
//! Sinks see a record only after the store has accepted it. They keep their
//! own copy; nothing they do can touch version history.

use std::future::Future;

use tracing::warn;

use crate::{SinkError, record::Record};

/// Anything that can receive a finished record.
pub trait Sink: Send + Sync {
  /// Short name used in logs.
  fn name(&self) -> &str;

  fn send(&self, record: &Record) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Counts from one [`FanOut::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
  pub delivered: usize,
  pub failed:    usize,
}

/// A fixed set of sinks, each called independently.
pub struct FanOut<S> {
  sinks: Vec<S>,
}

impl<S> Default for FanOut<S> {
  fn default() -> Self { Self { sinks: Vec::new() } }
}

impl<S: Sink> FanOut<S> {
  pub fn new(sinks: Vec<S>) -> Self { Self { sinks } }

  pub fn sinks(&self) -> &[S] { &self.sinks }

  pub fn is_empty(&self) -> bool { self.sinks.is_empty() }

  /// Send `record` to every sink. A failing sink is logged and skipped.
  pub async fn broadcast(&self, record: &Record) -> Delivery {
    let mut delivery = Delivery::default();
    for sink in &self.sinks {
      match sink.send(record).await {
        Ok(()) => delivery.delivered += 1,
        Err(err) => {
          warn!(sink = sink.name(), url = %record.url, error = %err, "sink failed");
          delivery.failed += 1;
        }
      }
    }
    delivery
  }
}
