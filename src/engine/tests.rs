//! Tests for engine module

use super::*;
use crate::expand::{IdentityExpander, TemplateExpander};
use crate::http::{BackoffPolicy, HttpClient, RateLimiter};
use crate::types::OutputFormat;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn lines(&self) -> Vec<Value> {
        let text = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
        text.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn fast_backoff(max_retries: u32) -> BackoffPolicy {
    BackoffPolicy::exponential(Duration::from_millis(1), Duration::from_millis(2), 0.0)
        .with_max_retries(max_retries)
}

fn context(config: WorkerConfig, backoff: BackoffPolicy, out: &SharedBuf) -> WorkerContext {
    WorkerContext {
        client: HttpClient::new().unwrap(),
        limiter: RateLimiter::unlimited(),
        backoff,
        emitter: Arc::new(ResultEmitter::new(OutputFormat::Json, Box::new(out.clone()))),
        wire: None,
        stats: Arc::new(RunStats::new()),
        token: CancellationToken::new(),
        config,
    }
}

fn engine(
    config: WorkerConfig,
    backoff: BackoffPolicy,
    selector: CollectionSelector,
    parallelism: usize,
    out: &SharedBuf,
) -> Engine {
    Engine::from_context(context(config, backoff, out), selector, parallelism)
}

fn input(records: Vec<Value>) -> mpsc::Receiver<Result<Value>> {
    let (tx, rx) = mpsc::channel(records.len().max(1));
    for record in records {
        tx.try_send(Ok(record)).unwrap();
    }
    rx
}

fn items() -> CollectionSelector {
    CollectionSelector::Field("items".into())
}

// ============================================================================
// Classification Tests
// ============================================================================

#[test_case(200, StatusClass::Success ; "ok")]
#[test_case(429, StatusClass::RateLimited ; "too many requests")]
#[test_case(404, StatusClass::ClientError ; "not found")]
#[test_case(403, StatusClass::ClientError ; "forbidden")]
#[test_case(500, StatusClass::Retryable ; "server error")]
#[test_case(503, StatusClass::Retryable ; "unavailable")]
#[test_case(204, StatusClass::Retryable ; "other success")]
#[test_case(302, StatusClass::Retryable ; "redirect")]
fn test_classify(code: u16, expected: StatusClass) {
    assert_eq!(classify(StatusCode::from_u16(code).unwrap()), expected);
}

// ============================================================================
// Worker Tests
// ============================================================================

#[tokio::test]
async fn test_merges_pages_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"items": [1, 2], "nextPageToken": "t"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .and(query_param("pageToken", "t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [3]})))
        .expect(1)
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);
    let expander = TemplateExpander::new(format!("{}/v1/items", server.uri())).unwrap();

    let stats = engine.run(input(vec![json!({"x": 1})]), &expander).await.unwrap();

    assert_eq!(
        out.lines(),
        vec![json!({"input": {"x": 1}, "response": {"items": [1, 2, 3]}})]
    );
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.emitted, 1);
}

#[tokio::test]
async fn test_seed_page_token_is_sent_on_first_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .and(query_param("pageToken", "resume"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"items": [9], "nextPageToken": "n"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .and(query_param("pageToken", "n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [10]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1]})))
        .expect(0)
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);
    let url = format!("{}/a?pageToken=resume", server.uri());

    engine
        .run(input(vec![json!(url)]), &IdentityExpander)
        .await
        .unwrap();

    assert_eq!(
        out.lines(),
        vec![json!({"input": url, "response": {"items": [9, 10]}})]
    );
}

#[tokio::test]
async fn test_retries_rate_limited_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": ["x"]})))
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);
    let url = format!("{}/a", server.uri());

    let stats = engine
        .run(input(vec![json!(url)]), &IdentityExpander)
        .await
        .unwrap();

    assert_eq!(stats.retries, 2);
    assert_eq!(stats.requests, 3);
    assert_eq!(out.lines(), vec![json!({"input": url, "response": {"items": ["x"]}})]);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "raw"})))
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(
        WorkerConfig::new(),
        fast_backoff(0),
        CollectionSelector::None,
        1,
        &out,
    );
    let url = format!("{}/raw", server.uri());

    engine
        .run(input(vec![json!(url)]), &IdentityExpander)
        .await
        .unwrap();

    assert_eq!(out.lines(), vec![json!({"input": url, "response": {"kind": "raw"}})]);
}

#[tokio::test]
async fn test_client_error_is_terminal_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": {"code": 404}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);
    let url = format!("{}/missing", server.uri());

    let stats = engine
        .run(input(vec![json!(url)]), &IdentityExpander)
        .await
        .unwrap();

    assert_eq!(
        out.lines(),
        vec![json!({"input": url, "response": {"error": {"code": 404}}})]
    );
    assert_eq!(stats.retries, 0);
    assert_eq!(stats.pages, 0);
}

#[tokio::test]
async fn test_filter_error_drops_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "denied"})))
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let config = WorkerConfig::new().with_filter_error(true);
    let engine = engine(config, fast_backoff(0), items(), 1, &out);

    let stats = engine
        .run(
            input(vec![json!(format!("{}/x", server.uri()))]),
            &IdentityExpander,
        )
        .await
        .unwrap();

    assert!(out.lines().is_empty());
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.emitted, 0);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(2), items(), 1, &out);

    let err = engine
        .run(
            input(vec![json!(format!("{}/flaky", server.uri()))]),
            &IdentityExpander,
        )
        .await
        .unwrap_err();

    match err {
        Error::RetryBudgetExhausted { url, attempts } => {
            assert!(url.ends_with("/flaky"));
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(out.lines().is_empty());
}

#[tokio::test]
async fn test_dry_run_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let config = WorkerConfig::new().with_execute(false);
    let engine = engine(config, fast_backoff(0), items(), 2, &out);
    let base = server.uri();

    let stats = engine
        .run(
            input(vec![json!(format!("{base}/a")), json!(format!("{base}/b"))]),
            &IdentityExpander,
        )
        .await
        .unwrap();

    assert!(out.lines().is_empty());
    assert_eq!(stats.seeds, 2);
    assert_eq!(stats.requests, 0);
}

#[tokio::test]
async fn test_missing_collection_key_is_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "list"})))
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);
    let url = format!("{}/v1/items", server.uri());

    engine
        .run(input(vec![json!(url)]), &IdentityExpander)
        .await
        .unwrap();

    assert_eq!(out.lines(), vec![json!({"input": url, "response": {}})]);
}

#[tokio::test]
async fn test_auto_collection_from_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"zones": ["a"], "x": 1})))
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(
        WorkerConfig::new(),
        fast_backoff(0),
        CollectionSelector::FromUrl,
        1,
        &out,
    );
    let url = format!("{}/v1/zones", server.uri());

    engine
        .run(input(vec![json!(url)]), &IdentityExpander)
        .await
        .unwrap();

    assert_eq!(out.lines(), vec![json!({"input": url, "response": {"zones": ["a"]}})]);
}

#[tokio::test]
async fn test_parallelism_one_keeps_input_order() {
    let server = MockServer::start().await;
    for (name, delay) in [("a", 60), ("b", 0), ("c", 30)] {
        Mock::given(method("GET"))
            .and(path(format!("/{name}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": name}))
                    .set_delay(Duration::from_millis(delay)),
            )
            .mount(&server)
            .await;
    }

    let out = SharedBuf::default();
    let engine = engine(
        WorkerConfig::new(),
        fast_backoff(0),
        CollectionSelector::None,
        1,
        &out,
    );
    let base = server.uri();
    let records = ["a", "b", "c"]
        .iter()
        .map(|n| json!(format!("{base}/{n}")))
        .collect();

    engine.run(input(records), &IdentityExpander).await.unwrap();

    let names: Vec<Value> = out.lines().iter().map(|l| l["response"]["name"].clone()).collect();
    assert_eq!(names, vec![json!("a"), json!("b"), json!("c")]);
}

#[tokio::test]
async fn test_multiple_seeds_per_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(
        WorkerConfig::new(),
        fast_backoff(0),
        CollectionSelector::None,
        2,
        &out,
    );
    let expander = crate::expand::JsonPathExpander::new("$.urls[*]").unwrap();
    let base = server.uri();
    let record = json!({"urls": [format!("{base}/1"), format!("{base}/2")]});

    let stats = engine.run(input(vec![record.clone()]), &expander).await.unwrap();

    assert_eq!(stats.records, 1);
    assert_eq!(stats.seeds, 2);
    let lines = out.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l["input"] == record));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_decode_failure_is_fatal_and_stops_admission() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/never"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);
    let base = server.uri();

    let err = engine
        .run(
            input(vec![json!(format!("{base}/bad")), json!(format!("{base}/never"))]),
            &IdentityExpander,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }), "{err:?}");
    assert!(engine.ctx.token.is_cancelled());
    assert!(out.lines().is_empty());
}

#[tokio::test]
async fn test_transport_failure_is_fatal() {
    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);

    let err = engine
        .run(input(vec![json!("http://127.0.0.1:9/x")]), &IdentityExpander)
        .await
        .unwrap_err();

    assert!(err.is_fatal_transport(), "{err:?}");
}

#[tokio::test]
async fn test_non_string_seed_is_fatal() {
    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);

    let err = engine
        .run(input(vec![json!(42)]), &IdentityExpander)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NonStringSeed { .. }), "{err:?}");
}

#[tokio::test]
async fn test_input_error_is_reported() {
    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);

    let (tx, rx) = mpsc::channel(1);
    tx.send(Err(Error::decode("bad input"))).await.unwrap();
    drop(tx);

    let err = engine.run(rx, &IdentityExpander).await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[tokio::test]
async fn test_external_cancellation() {
    let out = SharedBuf::default();
    let engine = engine(WorkerConfig::new(), fast_backoff(0), items(), 1, &out);
    engine.ctx.token.cancel();

    let (_tx, rx) = mpsc::channel::<Result<Value>>(1);
    let err = engine.run(rx, &IdentityExpander).await.unwrap_err();
    assert!(err.is_cancelled());
}

// ============================================================================
// Dispatcher Tests
// ============================================================================

#[tokio::test]
async fn test_dispatcher_bounds_concurrency() {
    let mut dispatcher = Dispatcher::new(2, CancellationToken::new());
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..6 {
        let running = running.clone();
        let peak = peak.clone();
        dispatcher
            .admit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
    }

    dispatcher.finish().await.unwrap();
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dispatcher_clamps_oversized_capacity() {
    let mut dispatcher = Dispatcher::new(usize::MAX, CancellationToken::new());
    dispatcher.admit(async { Ok(()) }).await.unwrap();
    dispatcher.finish().await.unwrap();

    let mut dispatcher = Dispatcher::new(0, CancellationToken::new());
    dispatcher.admit(async { Ok(()) }).await.unwrap();
    dispatcher.finish().await.unwrap();
}

#[tokio::test]
async fn test_dispatcher_first_error_wins() {
    let token = CancellationToken::new();
    let mut dispatcher = Dispatcher::new(4, token.clone());

    dispatcher
        .admit(async { Err(Error::decode("first")) })
        .await
        .unwrap();

    token.cancelled().await;
    let err = dispatcher.admit(async { Ok(()) }).await.unwrap_err();
    assert!(err.is_cancelled());
    dispatcher.fail(err);
    dispatcher.fail(Error::decode("second"));

    let err = dispatcher.finish().await.unwrap_err();
    assert_eq!(err.to_string(), Error::decode("first").to_string());
}

#[tokio::test]
async fn test_dispatcher_real_error_replaces_cancellation() {
    let token = CancellationToken::new();
    let dispatcher = Dispatcher::new(1, token.clone());

    dispatcher.fail(Error::Cancelled);
    dispatcher.fail(Error::decode("real"));

    let err = dispatcher.finish().await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn test_dispatcher_cancels_in_flight_work() {
    let token = CancellationToken::new();
    let mut dispatcher = Dispatcher::new(2, token.clone());

    let waiter = token.clone();
    dispatcher
        .admit(async move {
            waiter.cancelled().await;
            Err(Error::Cancelled)
        })
        .await
        .unwrap();
    dispatcher
        .admit(async { Err(Error::decode("boom")) })
        .await
        .unwrap();

    let err = dispatcher.finish().await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}
