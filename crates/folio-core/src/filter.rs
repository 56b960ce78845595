//! Publish-date window filter, applied before the gate and the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Drops articles published outside `[start, end]`. In strict mode an article
/// with no publish date is dropped too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PublishDateFilter {
  pub start:  Option<DateTime<Utc>>,
  pub end:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FilterReason {
  MissingPublishDate,
  TooOld { published: DateTime<Utc> },
  TooNew { published: DateTime<Utc> },
}

impl fmt::Display for FilterReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::MissingPublishDate => f.write_str("publish date missing"),
      Self::TooOld { published } => write!(f, "published {published}, before window"),
      Self::TooNew { published } => write!(f, "published {published}, after window"),
    }
  }
}

impl PublishDateFilter {
  pub fn screen(&self, record: &Record) -> Result<(), FilterReason> {
    let Some(published) = record.publish_date else {
      return if self.strict {
        Err(FilterReason::MissingPublishDate)
      } else {
        Ok(())
      };
    };
    if self.start.is_some_and(|start| published < start) {
      return Err(FilterReason::TooOld { published });
    }
    if self.end.is_some_and(|end| published > end) {
      return Err(FilterReason::TooNew { published });
    }
    Ok(())
  }
}
