//! Stored versions and the result of an upsert.
//!
//! Each URL owns one linear chain of entries. Links between versions are plain
//! ids, never references, so a chain is just rows in two flat tables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, record::Record};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned entry id; unique and monotonic within one backend.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
  Current,
  Archived,
}

/// A stored version of a [`Record`] plus its chain links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
  pub id:            EntryId,
  /// 1 for the first write of a URL, then +1 per promotion.
  pub version:       u32,
  /// The entry this one replaced; `None` only for version 1.
  pub ancestor_id:   Option<EntryId>,
  /// The entry that replaced this one; set exactly when archived.
  pub descendant_id: Option<EntryId>,
  pub state:         EntryState,
  pub record:        Record,
}

impl Entry {
  pub fn url(&self) -> &str { &self.record.url }

  pub fn is_current(&self) -> bool { self.state == EntryState::Current }

  /// The archived form of this entry, superseded by `descendant`.
  pub fn into_archived(self, descendant: EntryId) -> Entry {
    Entry {
      descendant_id: Some(descendant),
      state: EntryState::Archived,
      ..self
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What [`VersionStore::upsert`](crate::store::VersionStore::upsert) did with
/// a record. The only channel through which sinks and schedulers learn
/// whether to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  /// First write for the URL.
  Created { id: EntryId, version: u32 },
  /// Content changed; the previous current entry was archived.
  Promoted {
    id:          EntryId,
    version:     u32,
    ancestor_id: EntryId,
  },
  /// Content matched the current entry; no version was written.
  Unchanged { id: EntryId, version: u32 },
  /// Nothing was persisted. History is untouched.
  Failed { kind: ErrorKind },
}

impl Outcome {
  pub fn is_failed(&self) -> bool { matches!(self, Self::Failed { .. }) }

  /// The version now current for the URL, if the call succeeded.
  pub fn version(&self) -> Option<u32> {
    match *self {
      Self::Created { version, .. }
      | Self::Promoted { version, .. }
      | Self::Unchanged { version, .. } => Some(version),
      Self::Failed { .. } => None,
    }
  }

  /// Whether a new version was written.
  pub fn wrote_version(&self) -> bool {
    matches!(self, Self::Created { .. } | Self::Promoted { .. })
  }
}
