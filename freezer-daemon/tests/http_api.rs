//! HTTP API integration tests.
//!
//! Drive the real router over TCP with an in-memory runtime and a static
//! authenticator.

mod common;

use std::sync::Arc;

use common::{CLAIMLESS_TOKEN, POD_A_TOKEN, TestServer};
use freezer_daemon::StaticAuthenticator;
use freezer_daemon::runtime::InMemoryRuntime;
use freezer_daemon::runtime::memory::{Call, ContainerState};
use freezer_daemon::types::ContainerRef;
use serde_json::json;

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_no_token() {
    let server = TestServer::spawn().await;

    let response = server
        .post_json("/", None, &json!({ "action": "pause" }))
        .await;
    assert_eq!(response.status(), 400);
    assert!(server.runtime.calls().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_empty_token() {
    let server = TestServer::spawn().await;

    let response = server
        .post_json("/", Some(""), &json!({ "action": "pause" }))
        .await;
    assert_eq!(response.status(), 400);

    server.shutdown().await;
}

#[tokio::test]
async fn test_token_not_valid() {
    let server = TestServer::spawn().await;

    let response = server
        .post_json("/", Some("SOME_OTHER_TOKEN"), &json!({ "action": "pause" }))
        .await;
    assert_eq!(response.status(), 403);
    assert!(server.runtime.calls().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_token_validation_fails() {
    let server =
        TestServer::spawn_with(StaticAuthenticator::unavailable(), common::runtime()).await;

    let response = server
        .post_json("/", Some(POD_A_TOKEN), &json!({ "action": "pause" }))
        .await;
    assert_eq!(response.status(), 500);
    assert!(server.runtime.calls().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_token_without_pod_claim() {
    let server = TestServer::spawn().await;

    let response = server
        .post_json("/", Some(CLAIMLESS_TOKEN), &json!({ "action": "pause" }))
        .await;
    assert_eq!(response.status(), 500);
    assert!(server.runtime.calls().is_empty());

    server.shutdown().await;
}

// =============================================================================
// Body-encoded actions
// =============================================================================

#[tokio::test]
async fn test_valid_token_freeze() {
    let server = TestServer::spawn().await;

    let response = server
        .post_json("/", Some(POD_A_TOKEN), &json!({ "action": "pause" }))
        .await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().is_empty());

    assert_eq!(
        server.runtime.state_changes(),
        vec![Call::Pause(ContainerRef::from("user-1"))]
    );
    assert_eq!(server.runtime.state("user-1"), Some(ContainerState::Paused));
    assert_eq!(server.runtime.state("qp-1"), Some(ContainerState::Running));

    server.shutdown().await;
}

#[tokio::test]
async fn test_valid_token_freeze_then_thaw() {
    let server = TestServer::spawn().await;

    let response = server
        .post_json("/", Some(POD_A_TOKEN), &json!({ "action": "pause" }))
        .await;
    assert_eq!(response.status(), 200);

    let response = server
        .post_json("/", Some(POD_A_TOKEN), &json!({ "action": "resume" }))
        .await;
    assert_eq!(response.status(), 200);

    assert_eq!(
        server.runtime.state_changes(),
        vec![
            Call::Pause(ContainerRef::from("user-1")),
            Call::Resume(ContainerRef::from("user-1")),
        ]
    );
    assert_eq!(server.runtime.state("user-1"), Some(ContainerState::Running));

    server.shutdown().await;
}

#[tokio::test]
async fn test_invalid_action() {
    let server = TestServer::spawn().await;

    let response = server
        .post_json("/", Some(POD_A_TOKEN), &json!({ "action": "destroy" }))
        .await;
    assert_eq!(response.status(), 404);
    assert!(server.runtime.calls().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_missing_action() {
    let server = TestServer::spawn().await;

    let response = server.post_json("/", Some(POD_A_TOKEN), &json!({})).await;
    assert_eq!(response.status(), 404);

    let response = server.post("/", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 404);

    server.shutdown().await;
}

#[tokio::test]
async fn test_malformed_body() {
    let server = TestServer::spawn().await;

    let response = server.post_raw("/", POD_A_TOKEN, "{\"action\": ").await;
    assert_eq!(response.status(), 400);
    assert!(server.runtime.calls().is_empty());

    server.shutdown().await;
}

// =============================================================================
// Path-encoded actions
// =============================================================================

#[tokio::test]
async fn test_path_actions() {
    let server = TestServer::spawn().await;

    let response = server.post("/freeze", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 200);
    assert_eq!(server.runtime.state("user-1"), Some(ContainerState::Paused));

    let response = server.post("/thaw", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 200);

    let response = server.post("/pause", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 200);

    let response = server.post("/resume", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 200);
    assert_eq!(server.runtime.state("user-1"), Some(ContainerState::Running));
    assert_eq!(server.runtime.state_changes().len(), 4);

    server.shutdown().await;
}

#[tokio::test]
async fn test_path_unknown_action() {
    let server = TestServer::spawn().await;

    let response = server.post("/destroy", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 404);

    server.shutdown().await;
}

#[tokio::test]
async fn test_path_action_requires_token() {
    let server = TestServer::spawn().await;

    let response = server.post("/freeze", None).await;
    assert_eq!(response.status(), 400);

    let response = server.post("/freeze", Some("NOPE")).await;
    assert_eq!(response.status(), 403);

    server.shutdown().await;
}

// =============================================================================
// Engine outcomes
// =============================================================================

#[tokio::test]
async fn test_sidecar_only_pod_succeeds() {
    let runtime = Arc::new(InMemoryRuntime::new().with_pod("pod-a", &[("qp-1", "queue-proxy")]));
    let server = TestServer::spawn_with(common::authenticator(), runtime).await;

    let response = server.post("/freeze", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 200);
    assert!(server.runtime.state_changes().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_pod_not_found() {
    let runtime = Arc::new(InMemoryRuntime::new());
    let server = TestServer::spawn_with(common::authenticator(), runtime).await;

    let response = server.post("/freeze", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 500);

    server.shutdown().await;
}

#[tokio::test]
async fn test_runtime_failure_hides_details() {
    let runtime = common::runtime();
    runtime.break_container("user-1");
    let server = TestServer::spawn_with(common::authenticator(), runtime).await;

    let response = server
        .post_json("/", Some(POD_A_TOKEN), &json!({ "action": "pause" }))
        .await;
    assert_eq!(response.status(), 500);
    assert!(response.text().await.unwrap().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_double_freeze_is_refused() {
    let server = TestServer::spawn().await;

    let response = server.post("/freeze", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 200);

    let response = server.post("/freeze", Some(POD_A_TOKEN)).await;
    assert_eq!(response.status(), 500);
    assert_eq!(server.runtime.state("user-1"), Some(ContainerState::Paused));

    server.shutdown().await;
}
