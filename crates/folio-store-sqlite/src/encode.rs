//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. `authors` is stored as a
//! compact JSON array.

use chrono::{DateTime, Utc};
use folio_core::{
  entry::{Entry, EntryId, EntryState},
  record::Record,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Authors ─────────────────────────────────────────────────────────────────

pub fn encode_authors(authors: &[String]) -> Result<String> {
  Ok(serde_json::to_string(authors)?)
}

pub fn decode_authors(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Columns ─────────────────────────────────────────────────────────────────

/// Record columns in the order [`EncodedRecord::params`] binds them.
macro_rules! record_columns {
  () => {
    "url, download_date, modified_date, publish_date, source_domain, title, \
     page_title, rss_title, description, text, authors, image_url, language, \
     local_path, filename"
  };
}

pub const SELECT_CURRENT: &str = concat!(
  "SELECT id, version, ancestor_id, NULL, ",
  record_columns!(),
  " FROM current_versions WHERE url = ?1"
);

pub const SELECT_ARCHIVE: &str = concat!(
  "SELECT id, version, ancestor_id, descendant_id, ",
  record_columns!(),
  " FROM archive_versions WHERE url = ?1 ORDER BY version"
);

pub const INSERT_CURRENT: &str = concat!(
  "INSERT INTO current_versions (version, ancestor_id, ",
  record_columns!(),
  ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
   ?16, ?17)"
);

pub const INSERT_ARCHIVE: &str = concat!(
  "INSERT INTO archive_versions (id, version, ancestor_id, descendant_id, ",
  record_columns!(),
  ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
   ?16, ?17, ?18, ?19)"
);

// ─── Writing ─────────────────────────────────────────────────────────────────

/// A record with its non-text fields already encoded, ready to bind.
pub struct EncodedRecord<'a> {
  record:        &'a Record,
  download_date: String,
  modified_date: Option<String>,
  publish_date:  Option<String>,
  authors:       String,
}

impl<'a> EncodedRecord<'a> {
  pub fn new(record: &'a Record) -> Result<Self> {
    Ok(Self {
      record,
      download_date: encode_dt(record.download_date),
      modified_date: record.modified_date.map(encode_dt),
      publish_date: record.publish_date.map(encode_dt),
      authors: encode_authors(&record.authors)?,
    })
  }

  /// Bind values for [`record_columns!`], in order.
  pub fn params(&self) -> [&dyn rusqlite::ToSql; 15] {
    let r = self.record;
    [
      &r.url,
      &self.download_date,
      &self.modified_date,
      &self.publish_date,
      &r.source_domain,
      &r.title,
      &r.page_title,
      &r.rss_title,
      &r.description,
      &r.text,
      &self.authors,
      &r.image_url,
      &r.language,
      &r.local_path,
      &r.filename,
    ]
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `current_versions` or `archive_versions` row.
pub struct RawEntry {
  pub id:            i64,
  pub version:       i64,
  pub ancestor_id:   Option<i64>,
  pub descendant_id: Option<i64>,
  pub url:           String,
  pub download_date: String,
  pub modified_date: Option<String>,
  pub publish_date:  Option<String>,
  pub source_domain: Option<String>,
  pub title:         Option<String>,
  pub page_title:    Option<String>,
  pub rss_title:     Option<String>,
  pub description:   Option<String>,
  pub text:          Option<String>,
  pub authors:       String,
  pub image_url:     Option<String>,
  pub language:      Option<String>,
  pub local_path:    Option<String>,
  pub filename:      Option<String>,
}

impl RawEntry {
  /// Read a row selected by [`SELECT_CURRENT`] or [`SELECT_ARCHIVE`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      version:       row.get(1)?,
      ancestor_id:   row.get(2)?,
      descendant_id: row.get(3)?,
      url:           row.get(4)?,
      download_date: row.get(5)?,
      modified_date: row.get(6)?,
      publish_date:  row.get(7)?,
      source_domain: row.get(8)?,
      title:         row.get(9)?,
      page_title:    row.get(10)?,
      rss_title:     row.get(11)?,
      description:   row.get(12)?,
      text:          row.get(13)?,
      authors:       row.get(14)?,
      image_url:     row.get(15)?,
      language:      row.get(16)?,
      local_path:    row.get(17)?,
      filename:      row.get(18)?,
    })
  }

  /// The state is implied by the table the row came from.
  pub fn into_entry(self, state: EntryState) -> Result<Entry> {
    let version = u32::try_from(self.version)
      .map_err(|_| Error::Corrupt(format!("row {} has version {}", self.id, self.version)))?;

    let record = Record {
      url: self.url,
      download_date: decode_dt(&self.download_date)?,
      modified_date: decode_opt_dt(self.modified_date)?,
      publish_date: decode_opt_dt(self.publish_date)?,
      source_domain: self.source_domain,
      title: self.title,
      page_title: self.page_title,
      rss_title: self.rss_title,
      description: self.description,
      text: self.text,
      authors: decode_authors(&self.authors)?,
      image_url: self.image_url,
      language: self.language,
      local_path: self.local_path,
      filename: self.filename,
    };

    Ok(Entry {
      id: EntryId(self.id),
      version,
      ancestor_id: self.ancestor_id.map(EntryId),
      descendant_id: self.descendant_id.map(EntryId),
      state,
      record,
    })
  }
}
