//! Integration tests for the event-stream endpoint.

use axum::http::StatusCode;
use serde_json::json;

use portal_auth::Role;
use portal_core::config::{AppConfig, RateLimitConfig, RealtimeConfig, ServerConfig};
use portal_core::traits::{NewNotification, NotificationStore};

use crate::helpers::{EventReader, TestApp};

fn note(title: &str) -> NewNotification {
    NewNotification {
        title: title.to_string(),
        message: None,
        category: None,
        payload: json!({ "title": title }),
    }
}

#[tokio::test]
async fn test_stream_without_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.open_stream(None, "10.0.0.1").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.state.engine.registry.is_empty());
}

#[tokio::test]
async fn test_stream_with_invalid_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.open_stream(Some("not-a-jwt"), "10.0.0.1").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stream_sends_connected_then_stats() {
    let app = TestApp::new();
    app.store.create("u1", note("Exam moved")).await.unwrap();
    app.store.create("u1", note("Library fine")).await.unwrap();
    let token = TestApp::token("u1", Role::Student);

    let response = app.open_stream(Some(&token), "10.0.0.1").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(
        headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    assert_eq!(headers["cache-control"], "no-cache, no-transform");
    assert_eq!(headers["x-accel-buffering"], "no");

    let mut reader = EventReader::new(response);
    let (connected, stats) = reader.skip_handshake().await;

    let channel = &app.state.engine.registry.by_user("u1")[0];
    assert_eq!(connected["connectionId"], channel.id.as_str());
    assert_eq!(connected["data"]["activeConnections"], 1);
    assert_eq!(connected["data"]["userConnections"], 1);
    assert!(connected["timestamp"].is_string());
    assert_eq!(stats["data"]["unreadCount"], 2);
}

#[tokio::test]
async fn test_dropping_stream_deregisters_channel() {
    let app = TestApp::new();
    let token = TestApp::token("u1", Role::Student);

    let mut reader = EventReader::new(app.open_stream(Some(&token), "10.0.0.1").await);
    reader.skip_handshake().await;
    assert_eq!(app.state.engine.registry.len(), 1);

    drop(reader);

    assert!(app.state.engine.registry.is_empty());
}

#[tokio::test]
async fn test_rate_limited_stream_returns_retry_after() {
    let app = TestApp::with_realtime(RealtimeConfig {
        rate_limit: RateLimitConfig {
            max_per_window: 2,
            ..RateLimitConfig::default()
        },
        ..RealtimeConfig::default()
    });
    let token = TestApp::token("u1", Role::Student);

    let first = app.open_stream(Some(&token), "10.0.0.1").await;
    let second = app.open_stream(Some(&token), "10.0.0.1").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);

    let third = app.open_stream(Some(&token), "10.0.0.1").await;
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = third.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);

    // A different origin has its own window.
    let other = app.open_stream(Some(&token), "10.0.0.2").await;
    assert_eq!(other.status(), StatusCode::OK);
}

fn two_per_window() -> RealtimeConfig {
    RealtimeConfig {
        max_connections_per_user: 10,
        rate_limit: RateLimitConfig {
            max_per_window: 2,
            ..RateLimitConfig::default()
        },
        ..RealtimeConfig::default()
    }
}

#[tokio::test]
async fn test_forwarded_header_from_untrusted_peer_is_ignored() {
    let app = TestApp::with_realtime(two_per_window());
    let token = TestApp::token("u1", Role::Student);

    let mut statuses = Vec::new();
    let mut open = Vec::new();
    for i in 0..5 {
        let chain = format!("1.2.3.{i}");
        let response = app
            .open_stream_forwarded(Some(&token), "203.0.113.9", Some(&chain))
            .await;
        statuses.push(response.status());
        open.push(response);
    }

    assert_eq!(&statuses[..2], &[StatusCode::OK, StatusCode::OK]);
    assert!(
        statuses[2..]
            .iter()
            .all(|s| *s == StatusCode::TOO_MANY_REQUESTS)
    );
    let channels = app.state.engine.registry.by_user("u1");
    assert_eq!(channels.len(), 2);
    assert!(
        channels
            .iter()
            .all(|c| c.metadata.remote_addr.as_deref() == Some("203.0.113.9"))
    );
}

#[tokio::test]
async fn test_trusted_proxy_forwards_client_address() {
    let app = TestApp::with_config(AppConfig {
        server: ServerConfig {
            trusted_proxies: vec!["10.0.0.254".to_string()],
            ..ServerConfig::default()
        },
        realtime: two_per_window(),
        ..AppConfig::default()
    });
    let token = TestApp::token("u1", Role::Student);

    // Two clients behind the same proxy get separate windows.
    let mut open = Vec::new();
    for client in ["198.51.100.1", "198.51.100.2"] {
        for _ in 0..2 {
            let response = app
                .open_stream_forwarded(Some(&token), "10.0.0.254", Some(client))
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            open.push(response);
        }
    }
    let limited = app
        .open_stream_forwarded(Some(&token), "10.0.0.254", Some("198.51.100.1"))
        .await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    // A spoofed leftmost hop does not change the resolved client.
    let spoofed = app
        .open_stream_forwarded(Some(&token), "10.0.0.254", Some("7.7.7.7, 198.51.100.2"))
        .await;
    assert_eq!(spoofed.status(), StatusCode::TOO_MANY_REQUESTS);

    let addrs: Vec<_> = app
        .state
        .engine
        .registry
        .by_user("u1")
        .iter()
        .filter_map(|c| c.metadata.remote_addr.clone())
        .collect();
    assert_eq!(addrs.iter().filter(|a| *a == "198.51.100.1").count(), 2);
    assert_eq!(addrs.iter().filter(|a| *a == "198.51.100.2").count(), 2);
}

#[tokio::test]
async fn test_capacity_exceeded_returns_service_unavailable() {
    let app = TestApp::with_realtime(RealtimeConfig {
        max_connections: 1,
        ..RealtimeConfig::default()
    });

    let first = app
        .open_stream(Some(&TestApp::token("u1", Role::Student)), "10.0.0.1")
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let response = app
        .open_stream(Some(&TestApp::token("u2", Role::Student)), "10.0.0.2")
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "CAPACITY_EXCEEDED");

    drop(first);
}

#[tokio::test]
async fn test_per_user_ceiling_closes_oldest_stream() {
    let app = TestApp::with_realtime(RealtimeConfig {
        max_connections_per_user: 1,
        ..RealtimeConfig::default()
    });
    let token = TestApp::token("u1", Role::Student);

    let mut oldest = EventReader::new(app.open_stream(Some(&token), "10.0.0.1").await);
    oldest.skip_handshake().await;

    let mut newest = EventReader::new(app.open_stream(Some(&token), "10.0.0.1").await);
    newest.skip_handshake().await;

    assert!(oldest.next_event().await.is_none());
    assert_eq!(app.state.engine.registry.user_connection_count("u1"), 1);
    assert_eq!(app.state.engine.stats.snapshot().evictions, 1);
}
