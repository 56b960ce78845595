//! [`JsonFileSink`]: one JSON document per URL.

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU64, Ordering},
};

use folio_core::{SinkError, record::Record, sink::Sink};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Distinguishes concurrent writes of the same document.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Writes each record to `<dir>/<sha256(url)>.json`, replacing whatever an
/// earlier crawl of the same URL left there.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
  dir: PathBuf,
}

impl JsonFileSink {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  /// Where the document for `url` lives.
  pub fn path_for(&self, url: &str) -> PathBuf {
    let digest = Sha256::digest(url.as_bytes());
    self.dir.join(format!("{}.json", hex::encode(digest)))
  }
}

impl Sink for JsonFileSink {
  fn name(&self) -> &str { "json_file" }

  async fn send(&self, record: &Record) -> Result<(), SinkError> {
    let body = serde_json::to_vec_pretty(record)?;
    let path = self.path_for(&record.url);

    tokio::fs::create_dir_all(&self.dir).await?;
    // Readers never see a half-written file.
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    let partial = path.with_extension(format!("json.{}-{seq}.partial", std::process::id()));
    tokio::fs::write(&partial, body).await?;
    tokio::fs::rename(&partial, &path).await?;

    debug!(url = %record.url, path = %path.display(), "wrote article file");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn scratch_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
      .duration_since(std::time::UNIX_EPOCH)
      .unwrap()
      .as_nanos();
    std::env::temp_dir().join(format!("folio-sinks-{name}-{}-{nanos}", std::process::id()))
  }

  #[test]
  fn file_name_is_hex_sha256_of_url() {
    let sink = JsonFileSink::new("/srv/articles");
    let path = sink.path_for("https://a.test/");
    let name = path.file_name().unwrap().to_str().unwrap();
    assert_eq!(name.len(), 64 + ".json".len());
    assert!(name.trim_end_matches(".json").chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(path, sink.path_for("https://a.test/"));
    assert_ne!(path, sink.path_for("https://a.test/other"));
  }

  #[tokio::test]
  async fn later_send_replaces_earlier_file() {
    let dir = scratch_dir("json-file");
    let sink = JsonFileSink::new(&dir);

    let mut record = Record::new("https://a.test/", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    record.title = Some("first".into());
    sink.send(&record).await.unwrap();
    record.title = Some("second".into());
    sink.send(&record).await.unwrap();

    let written = tokio::fs::read(sink.path_for(&record.url)).await.unwrap();
    let back: Record = serde_json::from_slice(&written).unwrap();
    assert_eq!(back, record);

    let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
    let mut count = 0;
    while entries.next_entry().await.unwrap().is_some() {
      count += 1;
    }
    assert_eq!(count, 1);

    let _ = tokio::fs::remove_dir_all(&dir).await;
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_sends_for_one_url_all_land() {
    let dir = scratch_dir("json-file-concurrent");
    let sink = std::sync::Arc::new(JsonFileSink::new(&dir));
    let downloaded = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut tasks = Vec::new();
    for n in 0..16 {
      let sink = sink.clone();
      tasks.push(tokio::spawn(async move {
        let mut record = Record::new("https://a.test/", downloaded);
        record.text = Some(format!("edition {n}"));
        sink.send(&record).await
      }));
    }
    for task in tasks {
      task.await.unwrap().unwrap();
    }

    let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
      names.push(entry.file_name());
    }
    assert_eq!(names.len(), 1, "{names:?}");

    let written = tokio::fs::read(sink.path_for("https://a.test/")).await.unwrap();
    let back: Record = serde_json::from_slice(&written).unwrap();
    assert!(back.text.unwrap().starts_with("edition "));

    let _ = tokio::fs::remove_dir_all(&dir).await;
  }
}
