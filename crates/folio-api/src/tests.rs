//! Router tests against an in-memory pipeline.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::IntoResponse,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use folio_core::{
  ErrorKind,
  entry::Entry,
  gate::GateConfig,
  memory::MemoryAdapter,
  pipeline::Pipeline,
  record::Record,
  sink::FanOut,
  store::{StoreConfig, VersionStore},
};
use folio_sinks::MemorySink;
use serde_json::Value;
use tower::ServiceExt as _;

use crate::{ApiError, api_router, freshness::FreshnessBody};

const URL: &str = "https://news.example.com/a";
const URL_QUERY: &str = "https%3A%2F%2Fnews.example.com%2Fa";

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() }

fn hours(h: i64) -> DateTime<Utc> { t0() + TimeDelta::hours(h) }

fn article(text: &str, downloaded: DateTime<Utc>) -> Record {
  let mut r = Record::new(URL, downloaded);
  r.text = Some(text.into());
  r
}

fn make_pipeline() -> (Arc<Pipeline<MemoryAdapter, MemorySink>>, MemorySink) {
  let sink = MemorySink::new();
  let store = VersionStore::new(Arc::new(MemoryAdapter::new()), StoreConfig::default());
  let pipeline = Pipeline::new(
    Arc::new(store),
    GateConfig::default(),
    FanOut::new(vec![sink.clone()]),
  );
  (Arc::new(pipeline), sink)
}

async fn send(
  pipeline: &Arc<Pipeline<MemoryAdapter, MemorySink>>,
  req: Request<Body>,
) -> (StatusCode, Value) {
  let resp = api_router(pipeline.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, body)
}

fn post(record: &Record) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri("/records")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(serde_json::to_vec(record).unwrap()))
    .unwrap()
}

fn get(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ─── POST /records ───────────────────────────────────────────────────────────

#[tokio::test]
async fn first_record_is_created() {
  let (pipeline, sink) = make_pipeline();

  let (status, body) = send(&pipeline, post(&article("v1", t0()))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["disposition"], "stored");
  assert_eq!(body["outcome"]["outcome"], "created");
  assert_eq!(body["outcome"]["version"], 1);
  assert!(sink.get(URL).is_some());
}

#[tokio::test]
async fn recent_record_is_suppressed_then_promoted() {
  let (pipeline, _) = make_pipeline();
  send(&pipeline, post(&article("v1", t0()))).await;

  let (status, body) = send(&pipeline, post(&article("v2", hours(1)))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["disposition"], "suppressed");

  let (status, body) = send(&pipeline, post(&article("v2", hours(25)))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["outcome"]["outcome"], "promoted");
  assert_eq!(body["outcome"]["version"], 2);
}

#[tokio::test]
async fn blank_url_is_unprocessable() {
  let (pipeline, sink) = make_pipeline();
  let mut record = article("v1", t0());
  record.url = " ".into();

  let (status, body) = send(&pipeline, post(&record)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["error"].as_str().unwrap().contains("not persisted"));
  assert!(sink.is_empty());
}

#[tokio::test]
async fn malformed_body_is_rejected() {
  let (pipeline, _) = make_pipeline();
  let req = Request::builder()
    .method("POST")
    .uri("/records")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(r#"{"url": "https://a.test/"}"#))
    .unwrap();
  let resp = api_router(pipeline).oneshot(req).await.unwrap();
  assert!(resp.status().is_client_error());
}

// ─── GET /entries, /history ──────────────────────────────────────────────────

#[tokio::test]
async fn current_entry_and_history() {
  let (pipeline, _) = make_pipeline();
  send(&pipeline, post(&article("v1", t0()))).await;
  send(&pipeline, post(&article("v2", hours(30)))).await;

  let (status, body) = send(&pipeline, get(&format!("/entries?url={URL_QUERY}"))).await;
  assert_eq!(status, StatusCode::OK);
  let current: Entry = serde_json::from_value(body).unwrap();
  assert_eq!(current.version, 2);
  assert_eq!(current.record.text.as_deref(), Some("v2"));

  let (status, body) = send(&pipeline, get(&format!("/history?url={URL_QUERY}"))).await;
  assert_eq!(status, StatusCode::OK);
  let history: Vec<Entry> = serde_json::from_value(body).unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].descendant_id, Some(current.id));
}

#[tokio::test]
async fn unknown_url_is_not_found() {
  let (pipeline, _) = make_pipeline();
  let (status, body) = send(&pipeline, get(&format!("/entries?url={URL_QUERY}"))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());

  let (status, body) = send(&pipeline, get(&format!("/history?url={URL_QUERY}"))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, Value::Array(Vec::new()));
}

#[tokio::test]
async fn urls_are_looked_up_exactly_as_stored() {
  let (pipeline, _) = make_pipeline();
  let mut record = article("v1", t0());
  record.url = format!(" {URL} ");
  let (status, _) = send(&pipeline, post(&record)).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = send(&pipeline, get(&format!("/entries?url=%20{URL_QUERY}%20"))).await;
  assert_eq!(status, StatusCode::OK);
  let current: Entry = serde_json::from_value(body).unwrap();
  assert_eq!(current.record.url, record.url);

  let (status, body) = send(
    &pipeline,
    get(&format!("/freshness?url=%20{URL_QUERY}%20&at=2024-03-01T10:00:00Z")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_ne!(body["verdict"], "allow");

  let (status, _) = send(&pipeline, get(&format!("/entries?url={URL_QUERY}"))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_url_parameter_is_bad_request() {
  let (pipeline, _) = make_pipeline();
  let (status, _) = send(&pipeline, get("/entries?url=")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── GET /freshness ──────────────────────────────────────────────────────────

#[tokio::test]
async fn freshness_reflects_last_download() {
  let (pipeline, _) = make_pipeline();
  send(&pipeline, post(&article("v1", t0()))).await;

  let (status, body) = send(
    &pipeline,
    get(&format!("/freshness?url={URL_QUERY}&at=2024-03-01T10:00:00Z")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let body: FreshnessBody = serde_json::from_value(body).unwrap();
  assert!(!body.verdict.is_allowed());
  assert_eq!(body.at, hours(2));

  let (_, body) = send(
    &pipeline,
    get(&format!("/freshness?url={URL_QUERY}&at=2024-03-02T08:00:00Z")),
  )
  .await;
  assert_eq!(body["verdict"], "allow");
}

// ─── Error mapping ───────────────────────────────────────────────────────────

#[test]
fn failure_kinds_map_to_statuses() {
  let status = |kind| ApiError::NotPersisted(kind).into_response().status();
  assert_eq!(status(ErrorKind::Connectivity), StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(status(ErrorKind::Timeout), StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(status(ErrorKind::Consistency), StatusCode::CONFLICT);
  assert_eq!(status(ErrorKind::Query), StatusCode::UNPROCESSABLE_ENTITY);

  let unreachable = ApiError::Store(folio_core::Error::connectivity("refused"));
  assert_eq!(unreachable.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
}
