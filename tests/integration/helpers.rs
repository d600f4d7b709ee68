//! Shared test helpers for integration tests.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, BodyDataStream};
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, StatusCode};
use futures::StreamExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use portal_api::{AppState, build_app};
use portal_auth::jwt::Claims;
use portal_auth::{JwtAuthenticator, Role};
use portal_core::config::{AppConfig, AuthConfig, RealtimeConfig};
use portal_database::MemoryNotificationStore;

/// Secret shared by the test authenticator and the token helper.
pub const TEST_SECRET: &str = "integration-test-secret";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application state, for inspecting the engine directly
    pub state: AppState,
    /// In-memory notification store backing the app
    pub store: Arc<MemoryNotificationStore>,
}

impl TestApp {
    /// Create a test application with default realtime settings
    pub fn new() -> Self {
        Self::with_realtime(RealtimeConfig::default())
    }

    /// Create a test application with the given realtime settings
    pub fn with_realtime(realtime: RealtimeConfig) -> Self {
        Self::with_config(AppConfig {
            realtime,
            ..AppConfig::default()
        })
    }

    /// Create a test application from a full config; the token secret is
    /// always the test secret
    pub fn with_config(mut config: AppConfig) -> Self {
        config.auth = AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            leeway_seconds: 0,
        };

        let engine = portal_realtime::RealtimeEngine::new(&config.realtime);
        let authenticator = Arc::new(JwtAuthenticator::new(&config.auth));
        let store = Arc::new(MemoryNotificationStore::new());

        let state = AppState::new(config, engine, authenticator, store.clone());
        let router = build_app(state.clone());

        Self {
            router,
            state,
            store,
        }
    }

    /// Issue a signed access token
    pub fn token(user_id: &str, role: Role) -> String {
        let claims = Claims::new(user_id, role, chrono::Duration::minutes(5));
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .expect("Failed to sign token")
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            retry_after,
        }
    }

    /// Open an event stream from the given peer address, leaving the body
    /// unread
    pub async fn open_stream(&self, token: Option<&str>, peer: &str) -> Response<Body> {
        self.open_stream_forwarded(token, peer, None).await
    }

    /// Open an event stream from `peer`, optionally claiming an
    /// `X-Forwarded-For` chain
    pub async fn open_stream_forwarded(
        &self,
        token: Option<&str>,
        peer: &str,
        forwarded_for: Option<&str>,
    ) -> Response<Body> {
        let uri = match token {
            Some(token) => format!("/api/notifications/stream?token={token}"),
            None => "/api/notifications/stream".to_string(),
        };

        let mut builder = Request::builder()
            .method("GET")
            .uri(uri)
            .header("User-Agent", "integration-test");
        if let Some(chain) = forwarded_for {
            builder = builder.header("X-Forwarded-For", chain);
        }

        let mut req = builder.body(Body::empty()).expect("Failed to build request");
        let peer: IpAddr = peer.parse().expect("peer must be an IP address");
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(peer, 40_000)));

        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request")
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
    /// `Retry-After` header, if present
    pub retry_after: Option<String>,
}

/// Reads server-sent events off a streaming response body.
pub struct EventReader {
    stream: BodyDataStream,
    buffer: String,
}

impl EventReader {
    pub fn new(response: Response<Body>) -> Self {
        Self {
            stream: response.into_body().into_data_stream(),
            buffer: String::new(),
        }
    }

    /// Next `data:` payload as JSON, or `None` once the stream ends or
    /// stays silent for two seconds.
    pub async fn next_event(&mut self) -> Option<Value> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..end + 2).collect();
                let data = frame
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect::<Vec<_>>()
                    .join("\n");
                if data.is_empty() {
                    continue;
                }
                return serde_json::from_str(&data).ok();
            }

            let chunk = tokio::time::timeout(Duration::from_secs(2), self.stream.next())
                .await
                .ok()??;
            let bytes = chunk.ok()?;
            self.buffer.push_str(&String::from_utf8_lossy(&bytes));
        }
    }

    /// Reads and discards the `connected` and `stats` frames.
    pub async fn skip_handshake(&mut self) -> (Value, Value) {
        let connected = self.next_event().await.expect("connected frame");
        let stats = self.next_event().await.expect("stats frame");
        assert_eq!(connected["type"], "connected");
        assert_eq!(stats["type"], "stats");
        (connected, stats)
    }
}
