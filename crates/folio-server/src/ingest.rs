//! Feed a JSON Lines file of records through a pipeline.

use std::{collections::HashMap, sync::Arc};

use folio_core::{
  adapter::StorageAdapter,
  entry::Outcome,
  pipeline::{Disposition, Pipeline},
  record::Record,
  sink::Sink,
};
use serde::Serialize;
use tokio::{
  io::{AsyncBufRead, AsyncBufReadExt as _},
  sync::oneshot,
  task::JoinSet,
};
use tracing::{info, warn};

use crate::Result;

/// Tally of what happened to each line of an ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  pub created:    usize,
  pub promoted:   usize,
  pub unchanged:  usize,
  pub suppressed: usize,
  pub filtered:   usize,
  pub failed:     usize,
  /// Lines that were not a valid record.
  pub malformed:  usize,
}

impl IngestReport {
  fn tally(&mut self, disposition: Disposition) {
    match disposition {
      Disposition::Filtered { .. } => self.filtered += 1,
      Disposition::Suppressed { .. } => self.suppressed += 1,
      Disposition::Stored { outcome } => match outcome {
        Outcome::Created { .. } => self.created += 1,
        Outcome::Promoted { .. } => self.promoted += 1,
        Outcome::Unchanged { .. } => self.unchanged += 1,
        Outcome::Failed { .. } => self.failed += 1,
      },
    }
  }

  pub fn total(&self) -> usize {
    self.created
      + self.promoted
      + self.unchanged
      + self.suppressed
      + self.filtered
      + self.failed
      + self.malformed
  }
}

/// Process every record in `input`, at most `concurrency` at a time. Records
/// for the same URL are applied in file order. Blank lines are skipped;
/// malformed lines are logged and counted.
pub async fn ingest<A, S, R>(
  pipeline: Arc<Pipeline<A, S>>,
  input: R,
  concurrency: usize,
) -> Result<IngestReport>
where
  A: StorageAdapter,
  S: Sink + 'static,
  R: AsyncBufRead + Unpin,
{
  let concurrency = concurrency.max(1);
  let mut report = IngestReport::default();
  let mut tasks = JoinSet::new();
  // Completion signal of the latest task for each URL.
  let mut tails: HashMap<String, oneshot::Receiver<()>> = HashMap::new();
  let mut lines = input.lines();
  let mut line_no = 0usize;

  while let Some(line) = lines.next_line().await? {
    line_no += 1;
    if line.trim().is_empty() {
      continue;
    }
    let record: Record = match serde_json::from_str(&line) {
      Ok(record) => record,
      Err(err) => {
        warn!(line = line_no, error = %err, "skipping malformed record");
        report.malformed += 1;
        continue;
      }
    };

    if tasks.len() >= concurrency
      && let Some(done) = tasks.join_next().await
    {
      report.tally(done?);
    }
    let (finished, tail) = oneshot::channel();
    let previous = tails.insert(record.url.clone(), tail);
    let pipeline = pipeline.clone();
    tasks.spawn(async move {
      if let Some(previous) = previous {
        // Err only if that task died; go ahead regardless.
        let _ = previous.await;
      }
      let disposition = pipeline.process(record).await;
      let _ = finished.send(());
      disposition
    });
  }

  while let Some(done) = tasks.join_next().await {
    report.tally(done?);
  }

  info!(
    lines = line_no,
    created = report.created,
    promoted = report.promoted,
    unchanged = report.unchanged,
    suppressed = report.suppressed,
    failed = report.failed,
    "ingest finished"
  );
  Ok(report)
}
