//! Application state shared across all handlers and middleware.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use portal_auth::Authenticator;
use portal_core::config::AppConfig;
use portal_core::traits::NotificationStore;
use portal_realtime::RealtimeEngine;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Push engine.
    pub engine: RealtimeEngine,
    /// Resolves request credentials into principals.
    pub authenticator: Arc<dyn Authenticator>,
    /// Persisted-notification store.
    pub store: Arc<dyn NotificationStore>,
    /// Peers allowed to report the client address via `X-Forwarded-For`.
    pub trusted_proxies: Arc<[IpAddr]>,
    /// Process start time, for the health endpoint.
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state from its collaborators.
    pub fn new(
        config: AppConfig,
        engine: RealtimeEngine,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn NotificationStore>,
    ) -> Self {
        let trusted_proxies = config.server.trusted_proxy_addrs().into();
        Self {
            trusted_proxies,
            config: Arc::new(config),
            engine,
            authenticator,
            store,
            started_at: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
