//! [`JsonLinesSink`]: an append-only ledger of everything stored.

use std::path::{Path, PathBuf};

use folio_core::{SinkError, record::Record, sink::Sink};
use tokio::{
  fs::{File, OpenOptions},
  io::AsyncWriteExt as _,
  sync::Mutex,
};

/// Appends one compact JSON object per record to a single file. The file is
/// opened on first use and kept open.
#[derive(Debug)]
pub struct JsonLinesSink {
  path: PathBuf,
  file: Mutex<Option<File>>,
}

impl JsonLinesSink {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), file: Mutex::new(None) }
  }

  pub fn path(&self) -> &Path { &self.path }

  async fn open(&self) -> std::io::Result<File> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent).await?;
    }
    OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)
      .await
  }
}

impl Sink for JsonLinesSink {
  fn name(&self) -> &str { "json_lines" }

  async fn send(&self, record: &Record) -> Result<(), SinkError> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let mut guard = self.file.lock().await;
    let file = match guard.take() {
      Some(file) => file,
      None => self.open().await?,
    };
    let file = guard.insert(file);

    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  #[tokio::test]
  async fn each_send_appends_one_line() {
    let nanos = std::time::SystemTime::now()
      .duration_since(std::time::UNIX_EPOCH)
      .unwrap()
      .as_nanos();
    let path = std::env::temp_dir()
      .join(format!("folio-sinks-ledger-{}-{nanos}", std::process::id()))
      .join("stored.jsonl");
    let sink = JsonLinesSink::new(&path);

    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    sink.send(&Record::new("https://a.test/1", at)).await.unwrap();
    sink.send(&Record::new("https://a.test/2", at)).await.unwrap();

    let text = tokio::fs::read_to_string(&path).await.unwrap();
    let urls: Vec<String> = text
      .lines()
      .map(|l| serde_json::from_str::<Record>(l).unwrap().url)
      .collect();
    assert_eq!(urls, vec!["https://a.test/1", "https://a.test/2"]);

    if let Some(dir) = path.parent() {
      let _ = tokio::fs::remove_dir_all(dir).await;
    }
  }
}
