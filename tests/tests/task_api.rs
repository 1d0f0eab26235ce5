//! HTTP boundary tests for the task endpoint and health probes.

use axum::http::StatusCode;
use axum_test::TestServer;
use uuid::Uuid;

use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_submit_track_task() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let org = Uuid::new_v4();

    let response = server
        .post("/v1/tasks")
        .json(&fixtures::track_task_json(org, "page_view", "s-42"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["sessionId"], "s-42");
    assert_eq!(body["data"]["journeyStage"], "awareness");
    assert_eq!(body["data"]["metric"], "page_views");

    assert_eq!(ctx.store.event_count(), 1);
}

#[tokio::test]
async fn test_unknown_task_type_rejected() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/v1/tasks")
        .json(&serde_json::json!({
            "type": "rebuild_everything",
            "organizationId": Uuid::new_v4().to_string(),
            "data": {}
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.store.event_count(), 0);
}

#[tokio::test]
async fn test_validation_failure_maps_to_400() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // user id beyond the 128-char limit
    let response = server
        .post("/v1/tasks")
        .json(&serde_json::json!({
            "type": "track_event",
            "organizationId": Uuid::new_v4().to_string(),
            "data": {
                "userId": "u".repeat(200),
                "eventType": "page_view",
                "timestamp": "2025-03-10T09:00:00Z"
            }
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(ctx.store.event_count(), 0);
}

#[tokio::test]
async fn test_store_failure_maps_to_500() {
    let ctx = TestContext::new();
    ctx.store.set_fail_events(true);
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/v1/tasks")
        .json(&fixtures::track_task_json(Uuid::new_v4(), "page_view", "s-1"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("store error"));
}

#[tokio::test]
async fn test_task_failure_keeps_result_envelope() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // An empty funnel is an invalid task, answered with the envelope.
    let response = server
        .post("/v1/tasks")
        .json(&serde_json::json!({
            "type": "process_funnel",
            "organizationId": Uuid::new_v4().to_string(),
            "data": {
                "steps": [],
                "range": {
                    "start": "2025-03-01T00:00:00Z",
                    "end": "2025-04-01T00:00:00Z"
                }
            }
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("funnel"));
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["status"].is_string());

    server.get("/health/live").await.assert_status_ok();

    // No store backend was ever marked healthy in tests.
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
