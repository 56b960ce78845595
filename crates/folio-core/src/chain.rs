//! Structural checks over one URL's version chain.

use thiserror::Error;

use crate::entry::{Entry, EntryState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
  #[error("no entries")]
  Empty,

  #[error("no current entry")]
  NoCurrent,

  #[error("{0} current entries")]
  MultipleCurrent(usize),

  #[error("expected version {expected}, found {found}")]
  VersionGap { expected: u32, found: u32 },

  #[error("version {version} belongs to a different url")]
  UrlMismatch { version: u32 },

  #[error("version {version} does not point back at its predecessor")]
  AncestorMismatch { version: u32 },

  #[error("version {version} does not point forward at its successor")]
  DescendantMismatch { version: u32 },

  #[error("version {version} has the wrong state")]
  StateMismatch { version: u32 },
}

/// Verify `entries` (ascending by version, as returned by `history`) form one
/// linear chain: versions 1..=N without gaps, every archived entry linked
/// forward to the next, the last entry current and linked back.
pub fn verify_chain(entries: &[Entry]) -> Result<(), ChainViolation> {
  let Some(first) = entries.first() else {
    return Err(ChainViolation::Empty);
  };

  match entries.iter().filter(|e| e.is_current()).count() {
    0 => return Err(ChainViolation::NoCurrent),
    1 => {}
    n => return Err(ChainViolation::MultipleCurrent(n)),
  }

  for (idx, entry) in entries.iter().enumerate() {
    let expected = idx as u32 + 1;
    if entry.version != expected {
      return Err(ChainViolation::VersionGap { expected, found: entry.version });
    }
    if entry.url() != first.url() {
      return Err(ChainViolation::UrlMismatch { version: entry.version });
    }
  }

  for (idx, entry) in entries.iter().enumerate() {
    let prev = idx.checked_sub(1).map(|i| entries[i].id);
    if entry.ancestor_id != prev {
      return Err(ChainViolation::AncestorMismatch { version: entry.version });
    }

    let next = entries.get(idx + 1).map(|e| e.id);
    let expected_state = match next {
      Some(_) => EntryState::Archived,
      None => EntryState::Current,
    };
    if entry.state != expected_state {
      return Err(ChainViolation::StateMismatch { version: entry.version });
    }
    if entry.descendant_id != next {
      return Err(ChainViolation::DescendantMismatch { version: entry.version });
    }
  }

  Ok(())
}
