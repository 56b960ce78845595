//! [`SqliteAdapter`]: the SQLite implementation of [`StorageAdapter`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, ToSql, TransactionBehavior, params};
use tracing::debug;

use folio_core::{
  Error as CoreError, Result as CoreResult,
  adapter::{StorageAdapter, Transaction},
  entry::{Entry, EntryId, EntryState},
  record::Record,
};

use crate::{
  Result,
  encode::{
    EncodedRecord, INSERT_ARCHIVE, INSERT_CURRENT, RawEntry, SELECT_ARCHIVE,
    SELECT_CURRENT, decode_dt, encode_dt,
  },
  error::{classify, is_unique_violation},
  schema::SCHEMA,
};

/// How long a writer waits for another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Adapter ─────────────────────────────────────────────────────────────────

/// Current and archive tables in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteAdapter {
  conn: tokio_rusqlite::Connection,
}

impl SqliteAdapter {
  /// Open (or create) a database at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let adapter = Self { conn };
    adapter.init_schema().await?;
    Ok(adapter)
  }

  /// Open an in-memory database, for tests and embedding.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let adapter = Self { conn };
    adapter.init_schema().await?;
    Ok(adapter)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    debug!("schema ready");
    Ok(())
  }

  /// Run `f` on the connection thread.
  async fn call<R, F>(&self, f: F) -> Result<R>
  where
    R: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R> + Send + 'static,
  {
    Ok(self.conn.call(f).await?)
  }
}

impl StorageAdapter for SqliteAdapter {
  async fn transact<T, F>(&self, work: F) -> CoreResult<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut dyn Transaction) -> CoreResult<T> + Send + 'static,
  {
    // The outer result is the connection itself failing; the inner one is
    // whatever the transaction decided.
    self.call(move |conn| Ok(run_transaction(conn, work))).await?
  }

  async fn current(&self, url: &str) -> CoreResult<Option<Entry>> {
    let url = url.to_owned();
    let raw = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(SELECT_CURRENT, params![url], RawEntry::from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(raw.map(|r| r.into_entry(EntryState::Current)).transpose()?)
  }

  async fn history(&self, url: &str) -> CoreResult<Vec<Entry>> {
    let url = url.to_owned();
    let (archived, current) = self
      .call(move |conn| {
        // One read transaction so a concurrent promote can't be seen half-way.
        let tx = conn.transaction()?;
        let archived = {
          let mut stmt = tx.prepare(SELECT_ARCHIVE)?;
          stmt
            .query_map(params![url], RawEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let current = tx
          .query_row(SELECT_CURRENT, params![url], RawEntry::from_row)
          .optional()?;
        tx.commit()?;
        Ok((archived, current))
      })
      .await?;

    let mut entries = archived
      .into_iter()
      .map(|r| r.into_entry(EntryState::Archived))
      .collect::<Result<Vec<_>>>()?;
    if let Some(raw) = current {
      entries.push(raw.into_entry(EntryState::Current)?);
    }
    Ok(entries)
  }

  async fn last_download(&self, url: &str) -> CoreResult<Option<DateTime<Utc>>> {
    let url = url.to_owned();
    let raw: Option<String> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT download_date FROM current_versions WHERE url = ?1",
              params![url],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw.as_deref().map(decode_dt).transpose()?)
  }

  async fn ping(&self) -> CoreResult<()> {
    self
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// One `BEGIN IMMEDIATE` transaction around `work`. Dropping the
/// [`rusqlite::Transaction`] without committing rolls it back.
fn run_transaction<T, F>(conn: &mut rusqlite::Connection, work: F) -> CoreResult<T>
where
  F: FnOnce(&mut dyn Transaction) -> CoreResult<T>,
{
  let tx = conn
    .transaction_with_behavior(TransactionBehavior::Immediate)
    .map_err(classify)?;
  let value = work(&mut SqliteTx { conn: &tx })?;
  tx.commit().map_err(classify)?;
  Ok(value)
}

// ─── Transaction ─────────────────────────────────────────────────────────────

struct SqliteTx<'a> {
  conn: &'a rusqlite::Connection,
}

fn moved(entry: &Entry) -> CoreError {
  CoreError::Consistency(format!(
    "current entry {} (version {}) for {} changed",
    entry.id,
    entry.version,
    entry.url()
  ))
}

impl Transaction for SqliteTx<'_> {
  fn current(&mut self, url: &str) -> CoreResult<Option<Entry>> {
    let raw = self
      .conn
      .query_row(SELECT_CURRENT, params![url], RawEntry::from_row)
      .optional()
      .map_err(classify)?;
    Ok(raw.map(|r| r.into_entry(EntryState::Current)).transpose()?)
  }

  fn insert_current(
    &mut self,
    record: &Record,
    version: u32,
    ancestor_id: Option<EntryId>,
  ) -> CoreResult<EntryId> {
    let encoded = EncodedRecord::new(record)?;
    let ancestor = ancestor_id.map(|id| id.0);
    let head: [&dyn ToSql; 2] = [&version, &ancestor];
    let bound: Vec<&dyn ToSql> = head.into_iter().chain(encoded.params()).collect();

    match self.conn.execute(INSERT_CURRENT, bound.as_slice()) {
      Ok(_) => Ok(EntryId(self.conn.last_insert_rowid())),
      Err(err) if is_unique_violation(&err) => {
        Err(CoreError::Consistency(format!(
          "{} already has a current entry: {err}",
          record.url
        )))
      }
      Err(err) => Err(classify(err)),
    }
  }

  fn remove_current(&mut self, entry: &Entry) -> CoreResult<()> {
    let removed = self
      .conn
      .execute(
        "DELETE FROM current_versions WHERE id = ?1 AND version = ?2",
        params![entry.id.0, entry.version],
      )
      .map_err(classify)?;
    if removed != 1 {
      return Err(moved(entry));
    }
    Ok(())
  }

  fn append_archive(&mut self, entry: &Entry) -> CoreResult<()> {
    let Some(descendant) = entry.descendant_id.filter(|_| !entry.is_current()) else {
      return Err(CoreError::query(format!(
        "entry {} is not a superseded entry",
        entry.id
      )));
    };

    let encoded = EncodedRecord::new(&entry.record)?;
    let ancestor = entry.ancestor_id.map(|id| id.0);
    let head: [&dyn ToSql; 4] = [&entry.id.0, &entry.version, &ancestor, &descendant.0];
    let bound: Vec<&dyn ToSql> = head.into_iter().chain(encoded.params()).collect();

    self
      .conn
      .execute(INSERT_ARCHIVE, bound.as_slice())
      .map_err(classify)?;
    Ok(())
  }

  fn touch_current(&mut self, entry: &Entry, download_date: DateTime<Utc>) -> CoreResult<()> {
    let touched = self
      .conn
      .execute(
        "UPDATE current_versions SET download_date = ?3 WHERE id = ?1 AND version = ?2",
        params![entry.id.0, entry.version, encode_dt(download_date)],
      )
      .map_err(classify)?;
    if touched != 1 {
      return Err(moved(entry));
    }
    Ok(())
  }
}
