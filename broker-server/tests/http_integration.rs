//! HTTP-level integration tests for the task dispatch broker.
//!
//! These drive the deployed router contract through `tower::ServiceExt`
//! rather than `broker_core::Queue` directly, proving auth enforcement,
//! 404 bodies, and the submit/claim/report/wait HTTP surface end to end.

use std::sync::Arc;

use axum::body::Body;
use broker_core::{Queue, StatsCollector};
use broker_server::auth::Credentials;
use broker_server::router::build_router;
use broker_server::state::AppState;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app(credentials: Credentials) -> axum::Router {
    let state = AppState::new(
        Arc::new(Queue::new()),
        Arc::new(StatsCollector::new()),
        Arc::new(credentials),
    );
    build_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_requires_no_auth() {
    let app = test_app(Credentials::new());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn task_routes_reject_missing_credentials() {
    let mut credentials = Credentials::new();
    credentials.add_basic(&["alice:secret".to_string()]).unwrap();
    let app = test_app(credentials);

    let response = app
        .oneshot(Request::builder().uri("/task").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await, json!({"error": "Not authorized"}));
}

#[tokio::test]
async fn submit_claim_and_report_round_trip() {
    let app = test_app(Credentials::new());

    let submit = Request::builder()
        .method("POST")
        .uri("/task")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"name": "run_job", "pool": "default", "locks": ["db"], "kwargs": {"n": 1}}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(submit).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"result": "success"}));

    let claim = Request::builder()
        .method("PATCH")
        .uri("/task/pending?pool=default")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(claim).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let claimed = body_json(response).await;
    let task_id = claimed["id"].as_str().unwrap().to_string();
    assert_eq!(claimed["name"], "run_job");

    let report = Request::builder()
        .method("PATCH")
        .uri(format!("/task/{task_id}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({"status": "success", "result": "done"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(report).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"result": "Success"}));

    let again = Request::builder()
        .method("PATCH")
        .uri(format!("/task/{task_id}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({"status": "success"}).to_string()))
        .unwrap();
    let response = app.oneshot(again).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"error": "Unknown task"}));
}

#[tokio::test]
async fn claim_without_pool_returns_null() {
    let app = test_app(Credentials::new());

    let request = Request::builder()
        .method("PATCH")
        .uri("/task/pending")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn wait_submission_resolves_once_reported() {
    let app = test_app(Credentials::new());

    let submit = Request::builder()
        .method("POST")
        .uri("/task?wait=true")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "job", "pool": "p"}).to_string()))
        .unwrap();

    let app_for_report = app.clone();
    let submit_task = tokio::spawn(app.oneshot(submit));

    // Give the submit handler time to enqueue and start waiting before we
    // claim and report, so the rendezvous actually exercises the signal.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let claim = Request::builder()
        .method("PATCH")
        .uri("/task/pending?pool=p")
        .body(Body::empty())
        .unwrap();
    let claimed = body_json(app_for_report.clone().oneshot(claim).await.unwrap()).await;
    let task_id = claimed["id"].as_str().unwrap().to_string();

    let report = Request::builder()
        .method("PATCH")
        .uri(format!("/task/{task_id}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({"status": "success", "result": 42}).to_string()))
        .unwrap();
    app_for_report.oneshot(report).await.unwrap();

    let submit_response = submit_task.await.unwrap().unwrap();
    assert_eq!(submit_response.status(), StatusCode::OK);
    assert_eq!(body_json(submit_response).await, json!({"status": "success", "result": 42}));
}

/// Mirrors `test_queue_add_unique_ignore_kwargs` in the reference system's
/// test suite: two tasks differing only in an ignored kwarg are equivalent,
/// so the second `?unique=true` submission is suppressed. Sends
/// `unique_ignore_kwarg` as two separate repeated query params (plus a
/// decoy key that doesn't appear in either task's kwargs) to prove the
/// repeatable-query extraction actually collects every occurrence.
#[tokio::test]
async fn unique_ignore_kwarg_suppresses_equivalent_task_with_repeated_query_param() {
    let app = test_app(Credentials::new());

    let first = Request::builder()
        .method("POST")
        .uri("/task")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "test_task", "pool": "pool", "kwargs": {}}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(first).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let second = Request::builder()
        .method("POST")
        .uri("/task?unique=true&unique_ignore_kwarg=test&unique_ignore_kwarg=unused")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "test_task", "pool": "pool", "kwargs": {"test": 1}}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(second).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"result": "success"}));

    let pending = Request::builder().uri("/task").body(Body::empty()).unwrap();
    let response = app.oneshot(pending).await.unwrap();
    let tasks = body_json(response).await;
    assert_eq!(tasks.as_array().unwrap().len(), 1, "duplicate must have been suppressed");
    assert_eq!(tasks[0]["kwargs"], json!({}));
}
