//! Top-level push engine that ties the subsystems together.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use portal_core::config::RealtimeConfig;

use crate::connection::heartbeat::{HeartbeatHandle, HeartbeatScheduler};
use crate::connection::{Channel, ChannelMetadata, ConnectionRegistry};
use crate::error::AdmissionError;
use crate::message::{ConnectedData, StreamEvent};
use crate::metrics::EngineMetrics;
use crate::metrics::stats::StatsAggregator;
use crate::notification::dispatcher::PushDispatcher;
use crate::rate_limit::{RateLimitDecision, RateLimitKey, RateLimiter};

/// Origin used for rate limiting when the client address is unknown.
const UNKNOWN_ORIGIN: &str = "unknown";

/// Central push engine, constructed once at startup and shared by handlers.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Open channels.
    pub registry: Arc<ConnectionRegistry>,
    /// Connection-churn limiter.
    pub rate_limiter: Arc<RateLimiter>,
    /// Fan-out of pushes.
    pub dispatcher: Arc<PushDispatcher>,
    /// Keep-alive and stale sweep.
    pub heartbeat: Arc<HeartbeatScheduler>,
    /// Statistics view.
    pub stats: StatsAggregator,
    /// Counters.
    pub metrics: Arc<EngineMetrics>,
    heartbeat_handle: Arc<Mutex<Option<HeartbeatHandle>>>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("active", &self.registry.len())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates the engine. The heartbeat task is not started.
    pub fn new(config: &RealtimeConfig) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(config, metrics.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let dispatcher = Arc::new(PushDispatcher::new(
            config,
            registry.clone(),
            metrics.clone(),
        ));
        let heartbeat = Arc::new(HeartbeatScheduler::new(
            config,
            registry.clone(),
            rate_limiter.clone(),
        ));
        let stats = StatsAggregator::new(registry.clone(), metrics.clone());

        info!(
            max_connections = config.max_connections,
            max_per_user = config.max_connections_per_user,
            "Real-time engine initialized"
        );

        Self {
            registry,
            rate_limiter,
            dispatcher,
            heartbeat,
            stats,
            metrics,
            heartbeat_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawns the heartbeat task if it is not already running.
    pub fn start_heartbeat(&self) {
        let mut slot = self.heartbeat_handle.lock();
        if slot.is_none() {
            *slot = Some(self.heartbeat.clone().spawn());
        }
    }

    /// Runs admission for a new channel: rate limit, then registry caps.
    pub fn admit(
        &self,
        user_id: &str,
        metadata: ChannelMetadata,
    ) -> Result<(Arc<Channel>, mpsc::Receiver<StreamEvent>), AdmissionError> {
        if self.registry.is_shutting_down() {
            return Err(AdmissionError::ShuttingDown);
        }

        let origin = metadata
            .remote_addr
            .clone()
            .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string());
        let key = RateLimitKey::new(user_id, origin);
        if let RateLimitDecision::Denied { retry_after_secs } = self.rate_limiter.admit(&key) {
            self.metrics.inc_rate_limited();
            warn!(key = %key, retry_after_secs, "Channel admission rate limited");
            return Err(AdmissionError::RateLimited { retry_after_secs });
        }

        self.registry.register(user_id, metadata)
    }

    /// Builds the `connected` frame for a freshly admitted channel.
    pub fn connected_event(&self, channel: &Channel) -> StreamEvent {
        StreamEvent::connected(
            channel.id.clone(),
            ConnectedData {
                active_connections: self.registry.len(),
                user_connections: self.registry.user_connection_count(&channel.user_id),
            },
        )
    }

    /// Stops the heartbeat task and closes every channel.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");

        let handle = self.heartbeat_handle.lock().take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
        let closed = self.registry.close_all();

        info!(closed, "Real-time engine shut down");
    }
}
