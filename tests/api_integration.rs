//! Full-stack HTTP integration tests against the assembled axum router
//! (§6.1, §8 scenarios) — the counterpart to the teacher's
//! `tests/ipc_integration.rs`, generalized from a raw-TCP/msgpack
//! round-trip to an in-process `tower::ServiceExt::oneshot` request against
//! the real `Router` built by `chatops_core::api::router`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chatops_core::api::{router, AppState};
use chatops_core::k8s::FakeAdapter;
use chatops_core::policy::IdentityPolicy;
use chatops_core::state::ExecutionStateRegistry;
use chatops_core::sync::PriorityQueue;
use chatops_core::types::Config;
use chatops_core::worker::ResultTable;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn harness() -> AppState {
    let execution_state = ExecutionStateRegistry::new();
    let for_queue = execution_state.clone();
    AppState {
        config: Arc::new(Config::default()),
        identity: Arc::new(IdentityPolicy::new(3)),
        queue: Arc::new(PriorityQueue::new(Arc::new(move |len| {
            let execution_state = for_queue.clone();
            tokio::spawn(async move { execution_state.set_queue_length(len).await });
        }))),
        adapter: Arc::new(FakeAdapter::new(1)),
        execution_state,
        results: ResultTable::new(),
    }
}

async fn post_chat(state: &AppState, user: &str, role: Option<&str>, message: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .header("x-user-id", user);
    if let Some(role) = role {
        builder = builder.header("x-user-role", role);
    }
    let request = builder
        .body(Body::from(json!({ "message": message }).to_string()))
        .unwrap();

    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn chat_without_identity_header_is_401() {
    let state = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "message": "status" }).to_string()))
        .unwrap();
    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn help_command_returns_200_and_never_enqueues() {
    let state = harness();
    let (status, body) = post_chat(&state, "u1", None, "help me scale to 3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "HELP");
    assert_eq!(state.queue.size().await, 0);
}

#[tokio::test]
async fn execute_out_of_bounds_returns_400_scale_validation() {
    let state = harness();
    let (status, body) = post_chat(&state, "u1", None, "scale loadlab to 42").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorType"], "VALIDATION_ERROR");
    assert_eq!(state.queue.size().await, 0);
}

#[tokio::test]
async fn execute_within_bounds_returns_200_accepted_and_enqueues() {
    let state = harness();
    let (status, body) = post_chat(&state, "u1", None, "scale loadlab to 3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
    assert!(body["commandId"].is_string());
    assert_eq!(state.queue.size().await, 1);
}

#[tokio::test]
async fn quota_exhaustion_returns_429_scenario_4() {
    let state = harness();
    for _ in 0..3 {
        let (status, _) = post_chat(&state, "free-user", None, "scale loadlab to 2").await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = post_chat(&state, "free-user", None, "scale loadlab to 2").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["errorType"], "QUOTA_EXCEEDED");
}

#[tokio::test]
async fn internal_status_requires_auth_but_not_admin() {
    let state = harness();
    let request = Request::builder()
        .uri("/internal/status")
        .header("x-user-id", "u1")
        .body(Body::empty())
        .unwrap();
    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn internal_health_requires_admin_role_403_otherwise() {
    let state = harness();

    let request = Request::builder()
        .uri("/internal/health")
        .header("x-user-id", "u1")
        .header("x-user-role", "FREE")
        .body(Body::empty())
        .unwrap();
    let response = router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri("/internal/health")
        .header("x-user-id", "admin1")
        .header("x-user-role", "ADMIN")
        .body(Body::empty())
        .unwrap();
    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn dry_run_never_enqueues_and_warns_out_of_bounds_scenario_2() {
    let state = harness();
    let (status, body) = post_chat(&state, "u1", None, "dry run scale loadlab to 9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "DRY_RUN");
    assert_eq!(body["simulation"]["wouldExecute"], false);
    assert_eq!(state.queue.size().await, 0);
}
