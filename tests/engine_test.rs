use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::{Notify, watch};

use quarry::boundary::RecordingBoundary;
use quarry::engine::{ApiEngine, ExecutionState, Status};
use quarry::error::ApiError;
use quarry::middleware::{AfterSend, AfterSendOutcome, ApiContext};
use quarry::request::{Method, RequestDescriptor, TransportRequest};
use quarry::transport::TransportResponse;
use quarry::transport::mock::{MockCalls, MockTransport, PendingCall};

const WAIT: Duration = Duration::from_secs(2);

fn engine_with<T>(context: ApiContext) -> (ApiEngine<T>, MockCalls)
where
    T: serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    let (transport, calls) = MockTransport::new();
    (ApiEngine::new(Arc::new(transport), Arc::new(context)), calls)
}

fn engine() -> (ApiEngine<Value>, MockCalls) {
    engine_with(ApiContext::new())
}

fn get() -> RequestDescriptor {
    RequestDescriptor::get("http://test.url")
}

async fn next_call(calls: &mut MockCalls) -> PendingCall {
    tokio::time::timeout(WAIT, calls.next())
        .await
        .expect("no transport call was made")
        .expect("transport closed")
}

async fn wait_for<T: Clone>(
    rx: &mut watch::Receiver<ExecutionState<T>>,
    status: Status,
) -> ExecutionState<T> {
    tokio::time::timeout(WAIT, rx.wait_for(|s| s.status() == status))
        .await
        .expect("state never reached the expected status")
        .expect("engine state channel closed")
        .clone()
}

/// Let spawned attempts run to their next suspension point.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Response(TransportResponse),
    Error(ApiError),
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Seen>>,
}

impl Recorder {
    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AfterSend for Recorder {
    async fn after_send(&self, outcome: AfterSendOutcome<'_>) {
        let seen = match outcome {
            AfterSendOutcome::Response(response) => Seen::Response(response.clone()),
            AfterSendOutcome::Error(err) => Seen::Error(err.clone()),
        };
        self.seen.lock().unwrap().push(seen);
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────

#[tokio::test]
async fn returns_empty_state_initially() {
    let (engine, _calls) = engine();
    let state = engine.state();
    assert_eq!(state.status(), Status::Idle);
    assert!(state.data().is_none());
    assert!(state.error().is_none());
}

#[tokio::test]
async fn returns_loading_state_on_loading() {
    let (engine, mut calls) = engine();
    engine.trigger(get());
    assert_eq!(engine.state().status(), Status::Loading);

    let _call = next_call(&mut calls).await;
    let state = engine.state();
    assert!(state.is_loading());
    assert!(state.data().is_none());
    assert!(state.error().is_none());
}

#[tokio::test]
async fn fetches_data_from_the_server() {
    let (engine, mut calls) = engine();
    let mut rx = engine.subscribe();
    engine.trigger(get());

    let call = next_call(&mut calls).await;
    assert_eq!(call.request.target, "http://test.url");
    assert_eq!(call.request.method, Method::Get);
    assert_eq!(call.request.headers.len(), 1);
    assert_eq!(call.request.header("content-type"), Some("application/json"));
    assert!(call.request.body.is_none());

    call.ok(json!({ "test": "testResult" }));
    let state = wait_for(&mut rx, Status::Succeeded).await;
    assert_eq!(state.data(), Some(&json!({ "test": "testResult" })));
    assert!(state.error().is_none());
}

#[tokio::test]
async fn search_scenario_yields_names() {
    let (engine, mut calls) = engine_with::<Vec<String>>(ApiContext::new());
    let mut rx = engine.subscribe();
    engine.trigger(RequestDescriptor::get("a"));

    next_call(&mut calls)
        .await
        .respond(200, json!(["Alice", "Alex"]));
    let state = wait_for(&mut rx, Status::Succeeded).await;
    assert_eq!(
        state.into_data(),
        Some(vec!["Alice".to_string(), "Alex".to_string()])
    );
}

#[tokio::test]
async fn posts_data_to_the_server() {
    let (engine, mut calls) = engine_with::<Option<Value>>(ApiContext::new());
    let mut rx = engine.subscribe();
    engine.trigger(RequestDescriptor::post("http://test.url").with_json(json!({ "test": "body" })));

    let call = next_call(&mut calls).await;
    assert_eq!(call.request.method, Method::Post);
    assert_eq!(call.request.header("content-type"), Some("application/json"));
    let body: Value = serde_json::from_str(call.request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({ "test": "body" }));

    call.ok(Value::Null);
    let state = wait_for(&mut rx, Status::Succeeded).await;
    assert_eq!(state.data(), Some(&None));
}

// ── Local error mode ──────────────────────────────────────────────

#[tokio::test]
async fn local_mode_keeps_service_failure_in_state() {
    let boundary = Arc::new(RecordingBoundary::new());
    let (transport, mut calls) = MockTransport::new();
    let engine: ApiEngine<Value> = ApiEngine::with_boundary(
        Arc::new(transport),
        Arc::new(ApiContext::new()),
        boundary.clone(),
    );
    let mut rx = engine.subscribe();
    engine.trigger(get().local_errors());

    next_call(&mut calls)
        .await
        .respond(500, json!({ "error": "serverError" }));
    let state = wait_for(&mut rx, Status::Failed).await;

    let err = state.error().unwrap();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.message(), "serverError");
    assert_eq!(err.to_string(), "serverError (500)");
    assert!(state.data().is_none());
    assert!(boundary.caught().is_empty());
    assert!(engine.read().is_ok());
}

#[tokio::test]
async fn local_mode_keeps_network_failure_in_state() {
    let (engine, mut calls) = engine();
    let mut rx = engine.subscribe();
    engine.trigger(get().local_errors());

    next_call(&mut calls).await.fail("networkError");
    let state = wait_for(&mut rx, Status::Failed).await;
    assert_eq!(state.error(), Some(&ApiError::transport("networkError")));
}

// ── Propagate error mode ──────────────────────────────────────────

#[tokio::test]
async fn propagate_mode_hands_service_failure_to_boundary() {
    let boundary = Arc::new(RecordingBoundary::new());
    let (transport, mut calls) = MockTransport::new();
    let engine: ApiEngine<Value> = ApiEngine::with_boundary(
        Arc::new(transport),
        Arc::new(ApiContext::new()),
        boundary.clone(),
    );
    let mut rx = engine.subscribe();
    engine.trigger(get());

    next_call(&mut calls)
        .await
        .respond(500, json!({ "error": "serverError" }));
    let state = wait_for(&mut rx, Status::Failed).await;

    assert!(state.error().is_none());
    assert_eq!(boundary.caught(), vec![ApiError::service(500, "serverError")]);
    assert!(engine.read().is_ok());
}

#[tokio::test]
async fn propagate_mode_hands_network_failure_to_boundary() {
    let boundary = Arc::new(RecordingBoundary::new());
    let (transport, mut calls) = MockTransport::new();
    let engine: ApiEngine<Value> = ApiEngine::with_boundary(
        Arc::new(transport),
        Arc::new(ApiContext::new()),
        boundary.clone(),
    );
    let mut rx = engine.subscribe();
    engine.trigger(get());

    next_call(&mut calls).await.fail("networkError");
    wait_for(&mut rx, Status::Failed).await;
    assert_eq!(boundary.last(), Some(ApiError::transport("networkError")));
}

#[tokio::test]
async fn propagate_mode_without_boundary_escalates_on_read() {
    let (engine, mut calls) = engine();
    let mut rx = engine.subscribe();
    engine.trigger(get());

    next_call(&mut calls)
        .await
        .respond(500, json!({ "error": "serverError" }));
    wait_for(&mut rx, Status::Failed).await;

    let err = engine.read().unwrap_err();
    assert_eq!(err.message(), "serverError");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn new_trigger_clears_escalated_fault() {
    let (engine, mut calls) = engine();
    let mut rx = engine.subscribe();
    engine.trigger(get());
    next_call(&mut calls).await.fail("networkError");
    wait_for(&mut rx, Status::Failed).await;
    assert!(engine.read().is_err());

    engine.trigger(get());
    let state = engine.read().unwrap();
    assert!(state.is_loading());
}

// ── Cancellation and supersession ─────────────────────────────────

#[tokio::test]
async fn cancels_request_on_teardown() {
    let (engine, mut calls) = engine();
    let rx = engine.subscribe();
    engine.trigger(get());

    let call = next_call(&mut calls).await;
    assert!(!call.signal.is_cancelled());
    drop(engine);
    assert!(call.signal.is_cancelled());

    settle().await;
    assert!(!call.ok(json!({ "test": "late" })));
    settle().await;
    assert_eq!(rx.borrow().status(), Status::Loading);
}

#[tokio::test]
async fn cancels_request_on_next_trigger() {
    let (engine, mut calls) = engine();
    engine.trigger(get());
    let first = next_call(&mut calls).await;
    assert!(!first.signal.is_cancelled());

    engine.trigger(get());
    // Signaled before the second attempt's transport call can begin.
    assert!(first.signal.is_cancelled());

    let second = next_call(&mut calls).await;
    assert!(!second.signal.is_cancelled());
}

#[tokio::test]
async fn only_latest_outcome_is_observed() {
    let (engine, mut calls) = engine_with::<Vec<String>>(ApiContext::new());
    let mut rx = engine.subscribe();

    engine.trigger(RequestDescriptor::get("/api/search/first"));
    let first = next_call(&mut calls).await;
    engine.trigger(RequestDescriptor::get("/api/search/second"));
    let second = next_call(&mut calls).await;

    second.ok(json!(["second"]));
    let state = wait_for(&mut rx, Status::Succeeded).await;
    assert_eq!(state.into_data(), Some(vec!["second".to_string()]));

    first.ok(json!(["first"]));
    settle().await;
    assert_eq!(engine.state().into_data(), Some(vec!["second".to_string()]));
}

#[tokio::test]
async fn stale_settlement_before_successor_keeps_loading() {
    let (engine, mut calls) = engine();
    let mut rx = engine.subscribe();

    engine.trigger(get().local_errors());
    let first = next_call(&mut calls).await;
    engine.trigger(get().local_errors());
    let second = next_call(&mut calls).await;

    first.fail("stale failure");
    settle().await;
    let state = engine.state();
    assert!(state.is_loading());
    assert!(state.error().is_none());

    second.ok(json!("fresh"));
    let state = wait_for(&mut rx, Status::Succeeded).await;
    assert_eq!(state.data(), Some(&json!("fresh")));
}

#[tokio::test]
async fn sets_no_error_state_on_request_abort() {
    let recorder = Arc::new(Recorder::default());
    let (engine, mut calls) =
        engine_with::<Value>(ApiContext::new().with_after_send(recorder.clone()));
    engine.trigger(get().local_errors());

    next_call(&mut calls).await.abort();
    settle().await;

    let state = engine.state();
    assert_eq!(state.status(), Status::Loading);
    assert!(state.error().is_none());
    assert!(state.data().is_none());
    assert!(engine.read().is_ok());
    assert!(recorder.seen().is_empty());
}

// ── Middleware ────────────────────────────────────────────────────

#[tokio::test]
async fn before_send_adds_headers() {
    let context = ApiContext::new().before_send_fn(|mut request: TransportRequest| async move {
        request.append_header("x-added", "header")?;
        Ok(request)
    });
    let (engine, mut calls) = engine_with::<Value>(context);
    let mut rx = engine.subscribe();
    engine.trigger(get());

    let call = next_call(&mut calls).await;
    assert_eq!(call.request.headers.len(), 2);
    assert_eq!(call.request.header("content-type"), Some("application/json"));
    assert_eq!(call.request.header("x-added"), Some("header"));

    call.ok(json!({ "test": "testResult" }));
    wait_for(&mut rx, Status::Succeeded).await;
}

#[tokio::test]
async fn before_send_failure_is_a_transport_failure() {
    let context = ApiContext::new().before_send_fn(|_request: TransportRequest| async move {
        Err::<TransportRequest, _>(anyhow::anyhow!("hook failed"))
    });
    let (engine, mut calls) = engine_with::<Value>(context);
    let mut rx = engine.subscribe();
    engine.trigger(get().local_errors());

    let state = wait_for(&mut rx, Status::Failed).await;
    assert_eq!(state.error(), Some(&ApiError::transport("hook failed")));
    assert!(calls.try_next().is_none());
}

#[tokio::test]
async fn after_send_sees_raw_response_on_success() {
    let recorder = Arc::new(Recorder::default());
    let (engine, mut calls) =
        engine_with::<Value>(ApiContext::new().with_after_send(recorder.clone()));
    let mut rx = engine.subscribe();
    engine.trigger(get());

    next_call(&mut calls).await.ok(json!({ "test": "testResult" }));
    wait_for(&mut rx, Status::Succeeded).await;

    assert_eq!(
        recorder.seen(),
        vec![Seen::Response(TransportResponse::ok(
            json!({ "test": "testResult" })
        ))]
    );
}

#[tokio::test]
async fn after_send_sees_error_with_local_errors() {
    let recorder = Arc::new(Recorder::default());
    let (engine, mut calls) =
        engine_with::<Value>(ApiContext::new().with_after_send(recorder.clone()));
    let mut rx = engine.subscribe();
    engine.trigger(get().local_errors());

    next_call(&mut calls).await.fail("test error");
    wait_for(&mut rx, Status::Failed).await;

    assert_eq!(recorder.seen(), vec![Seen::Error(ApiError::transport("test error"))]);
}

#[tokio::test]
async fn after_send_sees_error_with_propagation() {
    let recorder = Arc::new(Recorder::default());
    let boundary = Arc::new(RecordingBoundary::new());
    let (transport, mut calls) = MockTransport::new();
    let engine: ApiEngine<Value> = ApiEngine::with_boundary(
        Arc::new(transport),
        Arc::new(ApiContext::new().with_after_send(recorder.clone())),
        boundary.clone(),
    );
    let mut rx = engine.subscribe();
    engine.trigger(get());

    next_call(&mut calls)
        .await
        .respond(503, json!({ "error": "down" }));
    wait_for(&mut rx, Status::Failed).await;

    assert_eq!(recorder.seen(), vec![Seen::Error(ApiError::service(503, "down"))]);
    assert_eq!(boundary.caught(), vec![ApiError::service(503, "down")]);
}

#[tokio::test]
async fn after_send_skips_superseded_attempts() {
    let recorder = Arc::new(Recorder::default());
    let (engine, mut calls) =
        engine_with::<Value>(ApiContext::new().with_after_send(recorder.clone()));
    let mut rx = engine.subscribe();

    engine.trigger(get());
    let first = next_call(&mut calls).await;
    engine.trigger(get());
    let second = next_call(&mut calls).await;

    first.ok(json!(1));
    second.ok(json!(2));
    wait_for(&mut rx, Status::Succeeded).await;
    settle().await;

    assert_eq!(recorder.seen(), vec![Seen::Response(TransportResponse::ok(json!(2)))]);
}

/// Holds every `after_send` until the test lets it go.
#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl AfterSend for Gate {
    async fn after_send(&self, _outcome: AfterSendOutcome<'_>) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[tokio::test]
async fn superseded_during_after_send_is_not_committed() {
    let gate = Arc::new(Gate::default());
    let (engine, mut calls) = engine_with::<Value>(ApiContext::new().with_after_send(gate.clone()));
    let mut rx = engine.subscribe();

    engine.trigger(get());
    next_call(&mut calls).await.ok(json!("first"));
    tokio::time::timeout(WAIT, gate.entered.notified())
        .await
        .expect("after_send never ran");

    engine.trigger(get());
    gate.release.notify_one();
    settle().await;
    assert!(engine.state().is_loading());

    gate.release.notify_one();
    next_call(&mut calls).await.ok(json!("second"));
    let state = wait_for(&mut rx, Status::Succeeded).await;
    assert_eq!(state.data(), Some(&json!("second")));
}
