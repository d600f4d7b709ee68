//! Integration tests for the internal push trigger.

use axum::http::StatusCode;
use serde_json::json;

use portal_auth::Role;

use crate::helpers::{EventReader, TestApp};

const PUSH: &str = "/api/notifications/push";

#[tokio::test]
async fn test_push_requires_authentication() {
    let app = TestApp::new();

    let response = app
        .request("POST", PUSH, Some(json!({ "broadcast": true, "notification": {} })), None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_push_forbidden_for_students() {
    let app = TestApp::new();
    let token = TestApp::token("s1", Role::Student);

    let response = app
        .request(
            "POST",
            PUSH,
            Some(json!({ "userIds": ["u1"], "notification": { "title": "Hi" } })),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_push_rejects_ambiguous_or_missing_target() {
    let app = TestApp::new();
    let token = TestApp::token("svc", Role::Service);

    let bodies = [
        json!({ "userIds": ["u1"], "broadcast": true, "notification": {} }),
        json!({ "notification": {} }),
        json!({ "userIds": [], "notification": {} }),
    ];

    for body in bodies {
        let response = app.request("POST", PUSH, Some(body.clone()), Some(&token)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(response.body["error"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_directed_push_reaches_open_stream() {
    let app = TestApp::new();
    let mut reader = EventReader::new(
        app.open_stream(Some(&TestApp::token("u1", Role::Student)), "10.0.0.1")
            .await,
    );
    reader.skip_handshake().await;

    let response = app
        .request(
            "POST",
            PUSH,
            Some(json!({
                "userIds": ["u1", "u2"],
                "notification": { "title": "Grades posted", "type": "grade" }
            })),
            Some(&TestApp::token("svc", Role::Service)),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["attempted"], 1);
    assert_eq!(response.body["data"]["delivered"], 1);
    assert_eq!(response.body["data"]["persisted"], 0);

    let event = reader.next_event().await.expect("notification frame");
    assert_eq!(event["type"], "notification");
    assert_eq!(event["data"]["title"], "Grades posted");
    assert_eq!(event["data"]["type"], "grade");
}

#[tokio::test]
async fn test_broadcast_reaches_every_user() {
    let app = TestApp::new();
    let mut first = EventReader::new(
        app.open_stream(Some(&TestApp::token("u1", Role::Student)), "10.0.0.1")
            .await,
    );
    let mut second = EventReader::new(
        app.open_stream(Some(&TestApp::token("u2", Role::Parent)), "10.0.0.2")
            .await,
    );
    first.skip_handshake().await;
    second.skip_handshake().await;

    let response = app
        .request(
            "POST",
            PUSH,
            Some(json!({ "broadcast": true, "notification": { "title": "Snow day" } })),
            Some(&TestApp::token("admin", Role::Admin)),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["attempted"], 2);

    for reader in [&mut first, &mut second] {
        let event = reader.next_event().await.expect("broadcast frame");
        assert_eq!(event["type"], "broadcast");
        assert_eq!(event["data"]["title"], "Snow day");
    }
    assert_eq!(app.state.engine.stats.snapshot().messages_sent, 2);
}

#[tokio::test]
async fn test_persisted_push_is_recorded_for_offline_users() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            PUSH,
            Some(json!({
                "userIds": ["u1", "u2"],
                "persist": true,
                "notification": { "title": "Fee reminder", "message": "Due Friday" }
            })),
            Some(&TestApp::token("svc", Role::Service)),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["attempted"], 0);
    assert_eq!(response.body["data"]["persisted"], 2);

    let records = app.store.records_for("u1");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Fee reminder");
    assert_eq!(records[0].message.as_deref(), Some("Due Friday"));
}

#[tokio::test]
async fn test_duplicate_targets_are_persisted_and_pushed_once() {
    let app = TestApp::new();
    let mut reader = EventReader::new(
        app.open_stream(Some(&TestApp::token("u1", Role::Student)), "10.0.0.1")
            .await,
    );
    reader.skip_handshake().await;

    let response = app
        .request(
            "POST",
            PUSH,
            Some(json!({
                "userIds": ["u1", "u1", "u2", "u1"],
                "persist": true,
                "notification": { "title": "Sports day" }
            })),
            Some(&TestApp::token("svc", Role::Service)),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["persisted"], 2);
    assert_eq!(response.body["data"]["persistFailed"], 0);
    assert_eq!(response.body["data"]["attempted"], 1);
    assert_eq!(app.store.records_for("u1").len(), 1);
    assert_eq!(app.store.records_for("u2").len(), 1);

    let event = reader.next_event().await.expect("notification frame");
    assert_eq!(event["data"]["title"], "Sports day");
}
