//! Integration tests for the statistics endpoint.

use axum::http::StatusCode;
use serde_json::json;

use portal_auth::Role;
use portal_core::traits::{NewNotification, NotificationStore};

use crate::helpers::{EventReader, TestApp};

const STATS: &str = "/api/notifications/stats";

#[tokio::test]
async fn test_student_sees_only_own_counts() {
    let app = TestApp::new();
    app.store
        .create(
            "u1",
            NewNotification {
                title: "Assembly".to_string(),
                message: None,
                category: None,
                payload: json!({}),
            },
        )
        .await
        .unwrap();
    let token = TestApp::token("u1", Role::Student);
    let mut reader = EventReader::new(app.open_stream(Some(&token), "10.0.0.1").await);
    reader.skip_handshake().await;

    let response = app
        .request("GET", &format!("{STATS}?detailed=true"), None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["notifications"]["total"], 1);
    assert_eq!(data["notifications"]["unread"], 1);
    assert_eq!(data["userConnections"], 1);
    assert!(data.get("aggregate").is_none());
    assert!(data.get("channels").is_none());
}

#[tokio::test]
async fn test_admin_sees_aggregate_and_channels() {
    let app = TestApp::new();
    let mut student = EventReader::new(
        app.open_stream(Some(&TestApp::token("u1", Role::Student)), "10.0.0.1")
            .await,
    );
    student.skip_handshake().await;
    let admin = TestApp::token("admin", Role::Admin);

    let summary = app.request("GET", STATS, None, Some(&admin)).await;
    assert_eq!(summary.status, StatusCode::OK);
    let aggregate = &summary.body["data"]["aggregate"];
    assert_eq!(aggregate["activeConnections"], 1);
    assert_eq!(aggregate["totalConnections"], 1);
    assert_eq!(aggregate["connectionsByUser"]["u1"], 1);
    assert!(summary.body["data"].get("channels").is_none());

    let detailed = app
        .request("GET", &format!("{STATS}?detailed=true"), None, Some(&admin))
        .await;
    let channels = detailed.body["data"]["channels"].as_array().unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0]["userId"], "u1");
    assert_eq!(channels[0]["userAgent"], "integration-test");
    assert_eq!(channels[0]["remoteAddr"], "10.0.0.1");
}

#[tokio::test]
async fn test_stats_requires_authentication() {
    let app = TestApp::new();

    let response = app.request("GET", STATS, None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
}
