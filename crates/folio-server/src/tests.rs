//! Configuration, assembly and ingest tests.

use std::sync::Arc;

use axum::{body::Body, http::Request};
use chrono::TimeDelta;
use folio_core::{gate::GateMode, memory::MemoryAdapter, store::UnchangedPolicy};
use folio_sinks::{ConfiguredSink, SinkConfig};
use tower::ServiceExt as _;

use crate::{Error, ServerConfig, assemble, ingest::ingest, router};

fn parse(toml: &str) -> ServerConfig {
  config::Config::builder()
    .add_source(config::File::from_str(toml, config::FileFormat::Toml))
    .build()
    .unwrap()
    .try_deserialize()
    .unwrap()
}

const FULL: &str = r#"
store_path = "/var/lib/folio/folio.db"
host = "0.0.0.0"
port = 9000
concurrency = 4

[gate]
min_revisit_hours = 12
mode = "request"

[store]
unchanged = "touch"
op_timeout_ms = 250

[filter]
start = "2024-01-01T00:00:00Z"
strict = true

[[sinks]]
kind = "json_lines"
path = "stored.jsonl"

[[sinks]]
kind = "memory"
"#;

// ─── Configuration ───────────────────────────────────────────────────────────

#[test]
fn full_config_parses() {
  let cfg = parse(FULL);
  assert_eq!(cfg.port, 9000);
  assert_eq!(cfg.concurrency, 4);
  assert_eq!(cfg.gate.mode, GateMode::Request);
  assert_eq!(
    cfg.gate.gate_config().unwrap().min_revisit_interval,
    TimeDelta::hours(12)
  );
  assert_eq!(cfg.store.unchanged, UnchangedPolicy::Touch);
  assert_eq!(cfg.store.store_config().unwrap().op_timeout.as_millis(), 250);
  assert!(cfg.filter.as_ref().unwrap().strict);
  assert_eq!(cfg.sinks.len(), 2);
  assert_eq!(cfg.sinks[1], SinkConfig::Memory);
}

#[test]
fn empty_config_uses_defaults() {
  let cfg = parse("");
  assert_eq!(cfg.host, "127.0.0.1");
  assert_eq!(cfg.port, 8090);
  assert_eq!(cfg.store_path.to_str(), Some("folio.db"));
  assert_eq!(cfg.gate.min_revisit_hours, 24);
  assert_eq!(cfg.gate.mode, GateMode::Item);
  assert_eq!(cfg.store.unchanged, UnchangedPolicy::Keep);
  assert_eq!(cfg.store.op_timeout_ms, 5_000);
  assert!(cfg.filter.is_none());
  assert!(cfg.sinks.is_empty());
}

#[test]
fn out_of_range_settings_are_rejected() {
  let mut cfg = parse("");
  cfg.gate.min_revisit_hours = u64::MAX;
  assert!(matches!(
    cfg.gate.gate_config(),
    Err(Error::InvalidSetting { setting: "gate.min_revisit_hours", .. })
  ));

  cfg.store.op_timeout_ms = 0;
  assert!(matches!(
    cfg.store.store_config(),
    Err(Error::InvalidSetting { setting: "store.op_timeout_ms", .. })
  ));
}

// ─── Ingest ──────────────────────────────────────────────────────────────────

const URL_A: &str = "https://news.example.com/a";
const URL_B: &str = "https://news.example.com/b";

fn line(url: &str, day: u32, text: &str) -> String {
  format!(
    r#"{{"url":"{url}","download_date":"2024-03-{day:02}T08:00:00Z","text":"{text}"}}"#
  )
}

#[tokio::test]
async fn ingest_tallies_every_line() {
  let cfg = parse("[[sinks]]\nkind = \"memory\"\n");
  let pipeline = Arc::new(assemble(Arc::new(MemoryAdapter::new()), &cfg).unwrap());

  let input = [
    line(URL_A, 1, "first"),
    String::new(),
    line(URL_B, 1, "other"),
    "{not json".to_owned(),
  ]
  .join("\n");

  let report = ingest(pipeline.clone(), input.as_bytes(), 4).await.unwrap();
  assert_eq!(report.created, 2);
  assert_eq!(report.malformed, 1);
  assert_eq!(report.total(), 3);

  let ConfiguredSink::Memory(sink) = &pipeline.sinks().sinks()[0] else {
    panic!("expected a memory sink");
  };
  assert_eq!(sink.len(), 2);

  // A day later: one changed, one recrawled too soon.
  let input = [line(URL_A, 2, "second"), line(URL_B, 1, "other again")].join("\n");
  let report = ingest(pipeline.clone(), input.as_bytes(), 4).await.unwrap();
  assert_eq!(report.promoted, 1);
  assert_eq!(report.suppressed, 1);

  let history = pipeline.store().history(URL_A).await.unwrap();
  assert_eq!(history.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ingest_applies_each_url_in_file_order() {
  for _ in 0..10 {
    let pipeline = Arc::new(assemble(Arc::new(MemoryAdapter::new()), &parse("")).unwrap());

    let mut input = Vec::new();
    for day in 1..=12 {
      input.push(line(URL_A, day, &format!("edition {day}")));
      input.push(line(URL_B, day, &format!("other {day}")));
    }
    let report = ingest(pipeline.clone(), input.join("\n").as_bytes(), 16)
      .await
      .unwrap();
    assert_eq!(report.created + report.promoted, 24);
    assert_eq!(report.suppressed, 0);

    for (url, prefix) in [(URL_A, "edition"), (URL_B, "other")] {
      let texts: Vec<String> = pipeline
        .store()
        .history(url)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.record.text.unwrap_or_default())
        .collect();
      let expected: Vec<String> = (1..=12).map(|day| format!("{prefix} {day}")).collect();
      assert_eq!(texts, expected);
    }
  }
}

#[tokio::test]
async fn ingest_respects_filter() {
  let cfg = parse("[filter]\nstrict = true\n");
  let pipeline = Arc::new(assemble(Arc::new(MemoryAdapter::new()), &cfg).unwrap());

  let report = ingest(pipeline, line(URL_A, 1, "undated").as_bytes(), 1)
    .await
    .unwrap();
  assert_eq!(report.filtered, 1);
  assert_eq!(report.created, 0);
}

// ─── Router ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn api_is_mounted_under_prefix() {
  let pipeline = Arc::new(assemble(Arc::new(MemoryAdapter::new()), &parse("")).unwrap());

  let req = Request::builder()
    .method("POST")
    .uri("/api/records")
    .header("content-type", "application/json")
    .body(Body::from(line(URL_A, 1, "first")))
    .unwrap();
  let resp = router(pipeline.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status().as_u16(), 201);

  let req = Request::builder()
    .uri("/records")
    .body(Body::empty())
    .unwrap();
  let resp = router(pipeline).oneshot(req).await.unwrap();
  assert_eq!(resp.status().as_u16(), 404);
}
