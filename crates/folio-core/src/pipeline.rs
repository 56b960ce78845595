//! [`Pipeline`]: filter, gate, store and fan-out for one record at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
  ErrorKind, Result,
  adapter::StorageAdapter,
  entry::Outcome,
  filter::{FilterReason, PublishDateFilter},
  gate::{DenyReason, FreshnessGate, GateConfig, Stage, Verdict},
  locks::KeyLocks,
  record::Record,
  sink::{FanOut, Sink},
  store::VersionStore,
};

/// What happened to a record handed to [`Pipeline::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum Disposition {
  /// Dropped by the publish-date filter.
  Filtered { reason: FilterReason },
  /// Dropped by the freshness gate.
  Suppressed { reason: DenyReason },
  /// Handed to the store.
  Stored { outcome: Outcome },
}

pub struct Pipeline<A, S> {
  store:  Arc<VersionStore<A>>,
  gate:   FreshnessGate<A>,
  filter: Option<PublishDateFilter>,
  sinks:  FanOut<S>,
  /// Held from the gate check through fan-out, so sinks receive a URL's
  /// records in the order they were committed.
  turns:  KeyLocks,
}

impl<A: StorageAdapter, S: Sink> Pipeline<A, S> {
  pub fn new(store: Arc<VersionStore<A>>, gate: GateConfig, sinks: FanOut<S>) -> Self {
    let gate = FreshnessGate::new(store.clone(), gate);
    Self { store, gate, filter: None, sinks, turns: KeyLocks::new() }
  }

  pub fn with_filter(mut self, filter: PublishDateFilter) -> Self {
    self.filter = Some(filter);
    self
  }

  pub fn store(&self) -> &Arc<VersionStore<A>> { &self.store }

  pub fn gate(&self) -> &FreshnessGate<A> { &self.gate }

  pub fn sinks(&self) -> &FanOut<S> { &self.sinks }

  /// Consult the gate before fetching `url`. Always allows unless the gate
  /// runs in request mode.
  pub async fn admit(&self, url: &str, now: DateTime<Utc>) -> Result<Verdict> {
    self.gate.check_stage(Stage::BeforeFetch, url, now).await
  }

  pub async fn process(&self, record: Record) -> Disposition {
    if let Some(filter) = &self.filter
      && let Err(reason) = filter.screen(&record)
    {
      debug!(url = %record.url, %reason, "filtered");
      return Disposition::Filtered { reason };
    }

    let _turn = self.turns.acquire(&record.url).await;

    match self
      .gate
      .check_stage(Stage::BeforeStore, &record.url, record.download_date)
      .await
    {
      Ok(Verdict::Allow) => {}
      Ok(Verdict::Deny(reason)) => {
        debug!(url = %record.url, %reason, "suppressed by freshness gate");
        return Disposition::Suppressed { reason };
      }
      Err(err) => {
        // The store has already logged entering degraded mode.
        if err.kind() == ErrorKind::Connectivity {
          debug!(url = %record.url, error = %err, "freshness lookup failed; record skipped");
        } else {
          warn!(url = %record.url, error = %err, "freshness lookup failed; record skipped");
        }
        return Disposition::Stored {
          outcome: Outcome::Failed { kind: err.kind() },
        };
      }
    }

    let outcome = if self.sinks.is_empty() {
      self.store.upsert(record).await
    } else {
      let outcome = self.store.upsert(record.clone()).await;
      if !outcome.is_failed() {
        self.sinks.broadcast(&record).await;
      }
      outcome
    };

    Disposition::Stored { outcome }
  }
}
