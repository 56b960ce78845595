//! [`VersionStore`]: the sole writer of version history.
//!
//! The upsert algorithm lives here once, written against
//! [`Transaction`](crate::adapter::Transaction). Backends only supply the
//! primitive reads and writes.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU8, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
  Error, ErrorKind, Result,
  adapter::{StorageAdapter, Transaction},
  entry::{Entry, Outcome},
  locks::KeyLocks,
  record::Record,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// What to do when a record arrives whose content matches the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnchangedPolicy {
  /// Write nothing.
  #[default]
  Keep,
  /// Move the current entry's `download_date` forward, nothing else.
  Touch,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
  pub unchanged:  UnchangedPolicy,
  /// Upper bound on one upsert, including the wait for its key lock.
  pub op_timeout: Duration,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      unchanged:  UnchangedPolicy::default(),
      op_timeout: Duration::from_secs(5),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Owns the version history of every URL behind one storage adapter.
///
/// Concurrent upserts for the same URL are serialised by an in-process key
/// lock; upserts for different URLs proceed independently.
pub struct VersionStore<A> {
  adapter:  Arc<A>,
  locks:    KeyLocks,
  config:   StoreConfig,
  degraded: AtomicBool,
}

impl<A: StorageAdapter> VersionStore<A> {
  pub fn new(adapter: Arc<A>, config: StoreConfig) -> Self {
    Self {
      adapter,
      locks: KeyLocks::new(),
      config,
      degraded: AtomicBool::new(false),
    }
  }

  pub fn adapter(&self) -> &Arc<A> { &self.adapter }

  pub fn config(&self) -> &StoreConfig { &self.config }

  /// Whether the last storage call failed to connect.
  pub fn is_degraded(&self) -> bool { self.degraded.load(Ordering::Acquire) }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist `record` as the next version of its URL, if its content differs
  /// from the current one. Failures are logged and reported as
  /// [`Outcome::Failed`]; history is never left half-written.
  pub async fn upsert(&self, record: Record) -> Outcome {
    let url = record.url.clone();
    match self.try_upsert(record).await {
      Ok(outcome) => {
        match outcome {
          Outcome::Created { id, .. } => {
            info!(%url, %id, "stored first version");
          }
          Outcome::Promoted { id, version, ancestor_id } => {
            info!(%url, %id, version, %ancestor_id, "promoted new version");
          }
          Outcome::Unchanged { version, .. } => {
            debug!(%url, version, "content unchanged");
          }
          Outcome::Failed { .. } => {}
        }
        outcome
      }
      Err(err) => {
        let kind = err.kind();
        match kind {
          ErrorKind::Connectivity => debug!(%url, error = %err, "record not persisted"),
          ErrorKind::Consistency => {
            warn!(%url, error = %err, "write conflict persisted after retry; record dropped")
          }
          ErrorKind::Query | ErrorKind::Timeout => {
            error!(%url, error = %err, "record not persisted")
          }
        }
        Outcome::Failed { kind }
      }
    }
  }

  /// Like [`Self::upsert`] but hands the error back instead of logging it.
  pub async fn try_upsert(&self, record: Record) -> Result<Outcome> {
    record.validate()?;
    self.ensure_available().await?;

    let result = match self.attempt(record.clone()).await {
      Err(Error::Consistency(reason)) => {
        debug!(url = %record.url, %reason, "current entry moved; retrying once");
        self.attempt(record).await
      }
      other => other,
    };

    self.observe(result)
  }

  async fn attempt(&self, record: Record) -> Result<Outcome> {
    let commit = CommitFlag::default();
    let _cancel_on_drop = CancelOnDrop(commit.clone());
    let policy = self.config.unchanged;

    let work = {
      let commit = commit.clone();
      async move {
        let held = self.locks.acquire(&record.url).await;
        self
          .adapter
          .transact(move |tx| {
            // Released only when the transaction has finished, even if the
            // caller stopped waiting.
            let _held = held;
            let outcome = apply(tx, &record, policy)?;
            if !commit.begin() {
              return Err(Error::Cancelled);
            }
            Ok(outcome)
          })
          .await
      }
    };
    tokio::pin!(work);

    match tokio::time::timeout(self.config.op_timeout, &mut work).await {
      Ok(result) => result,
      Err(_) if commit.cancel() => Err(Error::Timeout),
      // Already committing; the result is real, wait for it.
      Err(_) => work.await,
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn current(&self, url: &str) -> Result<Option<Entry>> {
    self.ensure_available().await?;
    let result = self.adapter.current(url).await;
    self.observe(result)
  }

  /// All versions of `url`, oldest first.
  pub async fn history(&self, url: &str) -> Result<Vec<Entry>> {
    self.ensure_available().await?;
    let result = self.adapter.history(url).await;
    self.observe(result)
  }

  pub async fn last_download(&self, url: &str) -> Result<Option<DateTime<Utc>>> {
    self.ensure_available().await?;
    let result = self.adapter.last_download(url).await;
    self.observe(result)
  }

  // ── Degraded mode ─────────────────────────────────────────────────────

  /// While degraded, every call probes the adapter first and fails fast if
  /// it is still unreachable.
  async fn ensure_available(&self) -> Result<()> {
    if !self.is_degraded() {
      return Ok(());
    }
    self.adapter.ping().await?;
    if self.degraded.swap(false, Ordering::AcqRel) {
      info!("storage reachable again");
    }
    Ok(())
  }

  fn observe<T>(&self, result: Result<T>) -> Result<T> {
    if let Err(err) = &result
      && err.kind() == ErrorKind::Connectivity
      && !self.degraded.swap(true, Ordering::AcqRel)
    {
      error!(error = %err, "storage unreachable; failing fast until it reconnects");
    }
    result
  }
}

// ─── Algorithm ───────────────────────────────────────────────────────────────

/// One upsert, executed inside a single transaction.
pub(crate) fn apply(
  tx: &mut dyn Transaction,
  record: &Record,
  policy: UnchangedPolicy,
) -> Result<Outcome> {
  let Some(old) = tx.current(&record.url)? else {
    let id = tx.insert_current(record, 1, None)?;
    return Ok(Outcome::Created { id, version: 1 });
  };

  if old.record.same_content(record) {
    if policy == UnchangedPolicy::Touch
      && record.download_date > old.record.download_date
    {
      tx.touch_current(&old, record.download_date)?;
    }
    return Ok(Outcome::Unchanged { id: old.id, version: old.version });
  }

  let version = old.version + 1;
  let ancestor_id = old.id;

  // The current table is unique on url, so the old row leaves first. None of
  // these steps is visible before commit.
  tx.remove_current(&old)?;
  let id = tx.insert_current(record, version, Some(ancestor_id))?;
  tx.append_archive(&old.into_archived(id))?;

  Ok(Outcome::Promoted { id, version, ancestor_id })
}

// ─── Commit/cancel handshake ─────────────────────────────────────────────────

const PENDING: u8 = 0;
const COMMITTING: u8 = 1;
const CANCELLED: u8 = 2;

/// Decides, exactly once, whether a transaction commits or the caller gave
/// up on it.
#[derive(Clone, Default)]
struct CommitFlag(Arc<AtomicU8>);

impl CommitFlag {
  /// Called by the transaction just before committing.
  fn begin(&self) -> bool {
    self
      .0
      .compare_exchange(PENDING, COMMITTING, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  /// Called by the caller when it stops waiting.
  fn cancel(&self) -> bool {
    self
      .0
      .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }
}

struct CancelOnDrop(CommitFlag);

impl Drop for CancelOnDrop {
  fn drop(&mut self) { self.0.cancel(); }
}
