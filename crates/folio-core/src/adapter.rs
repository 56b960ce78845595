//! The storage-adapter traits.
//!
//! Backends (e.g. `folio-store-sqlite`, or [`MemoryAdapter`](crate::memory::MemoryAdapter))
//! implement these. The versioning algorithm in [`crate::store`] talks only to
//! [`Transaction`]; SQL dialects never leak above this line.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  Result,
  entry::{Entry, EntryId},
  record::Record,
};

// ─── Transaction ─────────────────────────────────────────────────────────────

/// Synchronous operations available inside one storage transaction.
///
/// Everything done through a `Transaction` becomes visible atomically when the
/// enclosing [`StorageAdapter::transact`] commits, or not at all.
pub trait Transaction {
  /// Locking read of the current entry for `url`. Holds the row (or the
  /// database write lock) until the transaction ends.
  fn current(&mut self, url: &str) -> Result<Option<Entry>>;

  /// Insert a new current entry and return its assigned id.
  ///
  /// Fails with [`Error::Consistency`](crate::Error::Consistency) if another
  /// current entry for the same URL already exists.
  fn insert_current(
    &mut self,
    record: &Record,
    version: u32,
    ancestor_id: Option<EntryId>,
  ) -> Result<EntryId>;

  /// Remove `entry` from the current table. Fails with a consistency error
  /// if the stored row no longer matches `entry.id` and `entry.version`.
  fn remove_current(&mut self, entry: &Entry) -> Result<()>;

  /// Append an archived entry. Archived rows are never modified afterwards.
  fn append_archive(&mut self, entry: &Entry) -> Result<()>;

  /// Set the download date of the current entry without touching its
  /// version or links. Same matching rules as [`Self::remove_current`].
  fn touch_current(
    &mut self,
    entry: &Entry,
    download_date: DateTime<Utc>,
  ) -> Result<()>;
}

// ─── Adapter ─────────────────────────────────────────────────────────────────

/// Abstraction over a backend holding the current and archive tables.
///
/// All methods return `Send` futures so adapters can be shared across tokio
/// worker tasks.
pub trait StorageAdapter: Send + Sync + 'static {
  /// Run `work` inside one transaction. Commit if it returns `Ok`, roll back
  /// otherwise. The closure runs to completion even if the returned future is
  /// dropped; it owns everything it needs.
  fn transact<T, F>(&self, work: F) -> impl Future<Output = Result<T>> + Send
  where
    T: Send + 'static,
    F: FnOnce(&mut dyn Transaction) -> Result<T> + Send + 'static;

  /// Non-locking read of the current entry for `url`.
  fn current(
    &self,
    url: &str,
  ) -> impl Future<Output = Result<Option<Entry>>> + Send;

  /// Every stored version of `url`, archived and current, ascending by
  /// version.
  fn history(&self, url: &str) -> impl Future<Output = Result<Vec<Entry>>> + Send;

  /// Download date of the current entry for `url`; the freshness gate's
  /// only read.
  fn last_download(
    &self,
    url: &str,
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>>> + Send;

  /// Cheap reachability probe used to leave degraded mode.
  fn ping(&self) -> impl Future<Output = Result<()>> + Send;
}
