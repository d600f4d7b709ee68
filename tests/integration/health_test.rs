//! Integration tests for the health endpoint and shutdown behavior.

use axum::http::StatusCode;

use portal_auth::Role;

use crate::helpers::{EventReader, TestApp};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["status"], "ok");
    assert_eq!(data["activeChannels"], 0);
    assert!(data["version"].is_string());
}

#[tokio::test]
async fn test_shutdown_ends_streams_and_refuses_new_ones() {
    let app = TestApp::new();
    let token = TestApp::token("u1", Role::Student);
    let mut reader = EventReader::new(app.open_stream(Some(&token), "10.0.0.1").await);
    reader.skip_handshake().await;

    app.state.engine.shutdown().await;

    assert!(reader.next_event().await.is_none());

    let health = app.request("GET", "/api/health", None, None).await;
    assert_eq!(health.body["data"]["status"], "shutting_down");

    let refused = app.open_stream(Some(&token), "10.0.0.2").await;
    assert_eq!(refused.status(), StatusCode::SERVICE_UNAVAILABLE);
}
