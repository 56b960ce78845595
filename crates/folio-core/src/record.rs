//! The article record: the unit handed to the store by the extraction stage.
//!
//! A record is an immutable snapshot of one crawl of one URL. Only `url` and
//! `download_date` are mandatory; everything the extractors could not find is
//! left empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
  /// The canonical URL; the version-chain key.
  pub url:           String,
  /// When this copy was fetched.
  pub download_date: DateTime<Utc>,
  /// `Last-Modified` as reported by the server, if any.
  pub modified_date: Option<DateTime<Utc>>,
  /// Publication date extracted from the article itself.
  pub publish_date:  Option<DateTime<Utc>>,
  pub source_domain: Option<String>,
  /// Article headline.
  pub title:         Option<String>,
  /// Contents of the HTML `<title>` element.
  pub page_title:    Option<String>,
  /// Title as announced by the RSS feed that led to this URL.
  pub rss_title:     Option<String>,
  pub description:   Option<String>,
  /// Extracted body text.
  pub text:          Option<String>,
  #[serde(default)]
  pub authors:       Vec<String>,
  pub image_url:     Option<String>,
  pub language:      Option<String>,
  /// Where the raw download was saved, relative to the working directory.
  pub local_path:    Option<String>,
  pub filename:      Option<String>,
}

/// Borrowed view over the fields that make up a record's content. Download
/// bookkeeping (`download_date`, `modified_date`, `local_path`, `filename`)
/// changes on every fetch and is excluded.
#[derive(PartialEq)]
struct Content<'a> {
  publish_date:  Option<&'a DateTime<Utc>>,
  source_domain: Option<&'a str>,
  title:         Option<&'a str>,
  page_title:    Option<&'a str>,
  rss_title:     Option<&'a str>,
  description:   Option<&'a str>,
  text:          Option<&'a str>,
  authors:       &'a [String],
  image_url:     Option<&'a str>,
  language:      Option<&'a str>,
}

impl Record {
  /// A record with every optional field left empty.
  pub fn new(url: impl Into<String>, download_date: DateTime<Utc>) -> Self {
    Self {
      url: url.into(),
      download_date,
      modified_date: None,
      publish_date: None,
      source_domain: None,
      title: None,
      page_title: None,
      rss_title: None,
      description: None,
      text: None,
      authors: Vec::new(),
      image_url: None,
      language: None,
      local_path: None,
      filename: None,
    }
  }

  fn content(&self) -> Content<'_> {
    Content {
      publish_date:  self.publish_date.as_ref(),
      source_domain: self.source_domain.as_deref(),
      title:         self.title.as_deref(),
      page_title:    self.page_title.as_deref(),
      rss_title:     self.rss_title.as_deref(),
      description:   self.description.as_deref(),
      text:          self.text.as_deref(),
      authors:       &self.authors,
      image_url:     self.image_url.as_deref(),
      language:      self.language.as_deref(),
    }
  }

  /// Field-by-field equality over content, ignoring download bookkeeping.
  pub fn same_content(&self, other: &Record) -> bool {
    self.content() == other.content()
  }

  /// Reject records the store cannot key.
  pub fn validate(&self) -> Result<()> {
    if self.url.trim().is_empty() {
      return Err(Error::InvalidRecord("url must not be empty".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn article() -> Record {
    let mut r = Record::new(
      "https://news.example.com/a",
      Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    );
    r.title = Some("Headline".into());
    r.text = Some("Body".into());
    r.authors = vec!["A. Writer".into()];
    r
  }

  #[test]
  fn bookkeeping_fields_do_not_affect_content() {
    let a = article();
    let mut b = a.clone();
    b.download_date = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
    b.modified_date = Some(b.download_date);
    b.local_path = Some("2024/03/09/a.html".into());
    b.filename = Some("a.html".into());
    assert!(a.same_content(&b));
  }

  #[test]
  fn author_order_is_content() {
    let mut a = article();
    a.authors = vec!["One".into(), "Two".into()];
    let mut b = a.clone();
    b.authors.reverse();
    assert!(!a.same_content(&b));
  }

  #[test]
  fn empty_and_missing_text_differ() {
    let a = article();
    let mut b = a.clone();
    b.text = Some(String::new());
    assert!(!a.same_content(&b));
  }

  #[test]
  fn blank_url_is_invalid() {
    let mut r = article();
    r.url = "  ".into();
    assert!(matches!(r.validate(), Err(Error::InvalidRecord(_))));
  }

  #[test]
  fn missing_optional_fields_deserialize() {
    let r: Record = serde_json::from_str(
      r#"{"url":"https://x.test/","download_date":"2024-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    assert!(r.authors.is_empty());
    assert!(r.title.is_none());
  }
}
