//! The freshness gate: skip URLs that were downloaded too recently.
//!
//! The gate is read-only and lock-free. It may race with a concurrent write;
//! a wrong `Allow` costs at most one upsert that ends `Unchanged`. Lookups go
//! through the [`VersionStore`], so they share its degraded mode.

use std::{fmt, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, adapter::StorageAdapter, store::VersionStore};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Where in the crawl the gate is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
  /// Before issuing the fetch; saves bandwidth.
  Request,
  /// After extraction, just before storing.
  #[default]
  Item,
}

/// A point in the crawl at which the gate may be asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  BeforeFetch,
  BeforeStore,
}

impl GateMode {
  pub fn stage(self) -> Stage {
    match self {
      Self::Request => Stage::BeforeFetch,
      Self::Item => Stage::BeforeStore,
    }
  }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
  pub min_revisit_interval: TimeDelta,
  pub mode:                 GateMode,
}

impl Default for GateConfig {
  fn default() -> Self {
    Self {
      min_revisit_interval: TimeDelta::hours(24),
      mode:                 GateMode::default(),
    }
  }
}

// ─── Verdict ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
  TooRecent {
    last_download: DateTime<Utc>,
    next_allowed:  DateTime<Utc>,
  },
}

impl fmt::Display for DenyReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TooRecent { last_download, next_allowed } => write!(
        f,
        "too recent: downloaded {last_download}, next visit allowed at {next_allowed}"
      ),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Allow,
  Deny(DenyReason),
}

impl Verdict {
  pub fn is_allowed(&self) -> bool { matches!(self, Self::Allow) }
}

/// The gate's rule, without the lookup. A URL never stored is always allowed.
pub fn decide(
  last_download: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
  min_revisit_interval: TimeDelta,
) -> Verdict {
  let Some(last_download) = last_download else {
    return Verdict::Allow;
  };
  if now - last_download >= min_revisit_interval {
    return Verdict::Allow;
  }
  let next_allowed = last_download
    .checked_add_signed(min_revisit_interval)
    .unwrap_or(DateTime::<Utc>::MAX_UTC);
  Verdict::Deny(DenyReason::TooRecent { last_download, next_allowed })
}

// ─── Gate ────────────────────────────────────────────────────────────────────

pub struct FreshnessGate<A> {
  store:  Arc<VersionStore<A>>,
  config: GateConfig,
}

impl<A: StorageAdapter> FreshnessGate<A> {
  pub fn new(store: Arc<VersionStore<A>>, config: GateConfig) -> Self {
    Self { store, config }
  }

  pub fn config(&self) -> &GateConfig { &self.config }

  /// May `url` be fetched or stored again at `now`?
  pub async fn check(&self, url: &str, now: DateTime<Utc>) -> Result<Verdict> {
    let last = self.store.last_download(url).await?;
    Ok(decide(last, now, self.config.min_revisit_interval))
  }

  /// [`Self::check`], but only at the stage the gate is configured for; any
  /// other stage is allowed without a lookup.
  pub async fn check_stage(
    &self,
    stage: Stage,
    url: &str,
    now: DateTime<Utc>,
  ) -> Result<Verdict> {
    if self.config.mode.stage() != stage {
      return Ok(Verdict::Allow);
    }
    self.check(url, now).await
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() }

  #[test]
  fn first_visit_is_always_allowed() {
    assert_eq!(decide(None, t0(), TimeDelta::MAX), Verdict::Allow);
  }

  #[test]
  fn revisit_inside_interval_is_denied() {
    let verdict = decide(Some(t0()), t0() + TimeDelta::hours(1), TimeDelta::hours(24));
    assert_eq!(
      verdict,
      Verdict::Deny(DenyReason::TooRecent {
        last_download: t0(),
        next_allowed:  t0() + TimeDelta::hours(24),
      })
    );
  }

  #[test]
  fn revisit_at_exact_interval_is_allowed() {
    let verdict = decide(Some(t0()), t0() + TimeDelta::hours(24), TimeDelta::hours(24));
    assert!(verdict.is_allowed());
  }

  #[test]
  fn clock_skew_counts_as_too_recent() {
    let verdict = decide(Some(t0()), t0() - TimeDelta::minutes(5), TimeDelta::zero());
    assert!(!verdict.is_allowed());
  }

  #[test]
  fn huge_interval_does_not_overflow() {
    let verdict = decide(Some(t0()), t0(), TimeDelta::MAX);
    assert!(matches!(
      verdict,
      Verdict::Deny(DenyReason::TooRecent { next_allowed, .. })
        if next_allowed == DateTime::<Utc>::MAX_UTC
    ));
  }
}
