//! Per-key async locks.
//!
//! One `tokio` mutex per URL, created on demand and forgotten once nobody
//! holds or waits on it. Distinct keys never contend.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError, Weak},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive hold on one key. Owned, so it can be moved into a closure that
/// outlives the caller's future.
pub type KeyGuard = OwnedMutexGuard<()>;

const MIN_PRUNE_THRESHOLD: usize = 64;

#[derive(Debug)]
pub struct KeyLocks {
  slots: Mutex<Slots>,
}

#[derive(Debug)]
struct Slots {
  map:      HashMap<String, Weak<AsyncMutex<()>>>,
  prune_at: usize,
}

impl Default for KeyLocks {
  fn default() -> Self {
    Self {
      slots: Mutex::new(Slots {
        map:      HashMap::new(),
        prune_at: MIN_PRUNE_THRESHOLD,
      }),
    }
  }
}

impl KeyLocks {
  pub fn new() -> Self { Self::default() }

  /// Wait until `key` is free and take it.
  pub async fn acquire(&self, key: &str) -> KeyGuard {
    self.slot(key).lock_owned().await
  }

  fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
    let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(existing) = slots.map.get(key).and_then(Weak::upgrade) {
      return existing;
    }

    let fresh = Arc::new(AsyncMutex::new(()));
    slots.map.insert(key.to_owned(), Arc::downgrade(&fresh));

    if slots.map.len() >= slots.prune_at {
      slots.map.retain(|_, weak| weak.strong_count() > 0);
      slots.prune_at = (slots.map.len() * 2).max(MIN_PRUNE_THRESHOLD);
    }

    fresh
  }

  /// Number of keys currently held or awaited.
  pub fn active(&self) -> usize {
    let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
    slots.map.values().filter(|w| w.strong_count() > 0).count()
  }
}
