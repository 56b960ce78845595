//! [`MemoryAdapter`]: an in-process backend for embedding and tests.
//!
//! Transactions stage their writes privately and apply them in one step on
//! commit, so a failed transaction leaves nothing behind.

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  adapter::{StorageAdapter, Transaction},
  entry::{Entry, EntryId, EntryState},
  record::Record,
};

#[derive(Debug, Default)]
struct Tables {
  last_id: i64,
  current: HashMap<String, Entry>,
  archive: Vec<Entry>,
}

/// Current and archive tables held in memory, owned by whoever created the
/// adapter.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
  tables: Mutex<Tables>,
}

impl MemoryAdapter {
  pub fn new() -> Self { Self::default() }

  pub(crate) fn run<T, F>(&self, work: F) -> Result<T>
  where
    F: FnOnce(&mut dyn Transaction) -> Result<T>,
  {
    let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
    let mut tx = MemoryTx {
      last_id: tables.last_id,
      tables:  &*tables,
      current: HashMap::new(),
      archive: Vec::new(),
    };
    let value = work(&mut tx)?;

    let MemoryTx { last_id, current, archive, .. } = tx;
    tables.last_id = last_id;
    for (url, staged) in current {
      match staged {
        Some(entry) => tables.current.insert(url, entry),
        None => tables.current.remove(&url),
      };
    }
    tables.archive.extend(archive);
    Ok(value)
  }

  fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
    let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
    f(&tables)
  }
}

impl StorageAdapter for MemoryAdapter {
  async fn transact<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut dyn Transaction) -> Result<T> + Send + 'static,
  {
    self.run(work)
  }

  async fn current(&self, url: &str) -> Result<Option<Entry>> {
    Ok(self.read(|t| t.current.get(url).cloned()))
  }

  async fn history(&self, url: &str) -> Result<Vec<Entry>> {
    Ok(self.read(|t| {
      let mut entries: Vec<Entry> = t
        .archive
        .iter()
        .filter(|e| e.url() == url)
        .chain(t.current.get(url))
        .cloned()
        .collect();
      entries.sort_by_key(|e| e.version);
      entries
    }))
  }

  async fn last_download(&self, url: &str) -> Result<Option<DateTime<Utc>>> {
    Ok(self.read(|t| t.current.get(url).map(|e| e.record.download_date)))
  }

  async fn ping(&self) -> Result<()> { Ok(()) }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

struct MemoryTx<'a> {
  tables:  &'a Tables,
  last_id: i64,
  /// `None` marks a removal.
  current: HashMap<String, Option<Entry>>,
  archive: Vec<Entry>,
}

impl MemoryTx<'_> {
  fn visible(&self, url: &str) -> Option<&Entry> {
    match self.current.get(url) {
      Some(staged) => staged.as_ref(),
      None => self.tables.current.get(url),
    }
  }

  fn visible_mut(&mut self, url: &str) -> Option<&mut Entry> {
    if !self.current.contains_key(url) {
      let committed = self.tables.current.get(url).cloned();
      self.current.insert(url.to_owned(), committed);
    }
    self.current.get_mut(url).and_then(Option::as_mut)
  }

  fn expect_current(&self, entry: &Entry) -> Result<()> {
    match self.visible(entry.url()) {
      Some(e) if e.id == entry.id && e.version == entry.version => Ok(()),
      _ => Err(Error::Consistency(format!(
        "current entry {} for {} changed",
        entry.id,
        entry.url()
      ))),
    }
  }
}

impl Transaction for MemoryTx<'_> {
  fn current(&mut self, url: &str) -> Result<Option<Entry>> {
    Ok(self.visible(url).cloned())
  }

  fn insert_current(
    &mut self,
    record: &Record,
    version: u32,
    ancestor_id: Option<EntryId>,
  ) -> Result<EntryId> {
    if self.visible(&record.url).is_some() {
      return Err(Error::Consistency(format!(
        "{} already has a current entry",
        record.url
      )));
    }
    self.last_id += 1;
    let id = EntryId(self.last_id);
    self.current.insert(
      record.url.clone(),
      Some(Entry {
        id,
        version,
        ancestor_id,
        descendant_id: None,
        state: EntryState::Current,
        record: record.clone(),
      }),
    );
    Ok(id)
  }

  fn remove_current(&mut self, entry: &Entry) -> Result<()> {
    self.expect_current(entry)?;
    self.current.insert(entry.url().to_owned(), None);
    Ok(())
  }

  fn append_archive(&mut self, entry: &Entry) -> Result<()> {
    if entry.state != EntryState::Archived || entry.descendant_id.is_none() {
      return Err(Error::query(format!(
        "entry {} is not a superseded entry",
        entry.id
      )));
    }
    self.archive.push(entry.clone());
    Ok(())
  }

  fn touch_current(
    &mut self,
    entry: &Entry,
    download_date: DateTime<Utc>,
  ) -> Result<()> {
    self.expect_current(entry)?;
    if let Some(current) = self.visible_mut(entry.url()) {
      current.record.download_date = download_date;
    }
    Ok(())
  }
}
