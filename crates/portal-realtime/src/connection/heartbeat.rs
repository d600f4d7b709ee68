//! Keep-alive pings and stale-channel pruning.
//!
//! [`HeartbeatScheduler::ping_all`] and [`HeartbeatScheduler::sweep_stale`]
//! are each one tick of work and can be called directly; [`HeartbeatScheduler::spawn`]
//! drives both on their own intervals until cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use portal_core::config::RealtimeConfig;

use crate::message::StreamEvent;
use crate::notification::dispatcher::DeliveryReport;
use crate::rate_limit::RateLimiter;

use super::channel::CloseReason;
use super::registry::ConnectionRegistry;

/// Periodic liveness driver for every open channel.
#[derive(Debug)]
pub struct HeartbeatScheduler {
    registry: Arc<ConnectionRegistry>,
    rate_limiter: Arc<RateLimiter>,
    heartbeat_interval: Duration,
    sweep_interval: Duration,
    stale_timeout: Duration,
}

impl HeartbeatScheduler {
    /// Creates a scheduler over the registry and rate limiter.
    pub fn new(
        config: &RealtimeConfig,
        registry: Arc<ConnectionRegistry>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            registry,
            rate_limiter,
            heartbeat_interval: config.heartbeat_interval(),
            sweep_interval: config.sweep_interval(),
            stale_timeout: config.stale_timeout(),
        }
    }

    /// Queues a `ping` frame on every channel.
    ///
    /// A channel whose queue rejects the frame is deregistered; there is no
    /// retry.
    pub fn ping_all(&self) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for channel in self.registry.all() {
            report.attempted += 1;
            let uptime_ms = channel.uptime().as_millis() as u64;
            match channel.send(StreamEvent::ping(channel.id.clone(), uptime_ms)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    debug!(channel_id = %channel.id, error = %e, "Ping failed");
                    self.registry.deregister(&channel.id, CloseReason::WriteFailed);
                }
            }
        }
        if report.attempted > 0 {
            debug!(
                attempted = report.attempted,
                failed = report.failed,
                "Heartbeat ping tick"
            );
        }
        report
    }

    /// Deregisters channels not refreshed within the staleness timeout and
    /// garbage-collects idle rate-limit windows.
    ///
    /// Returns the number of channels removed. Running it twice in a row
    /// removes nothing the second time.
    pub fn sweep_stale(&self) -> usize {
        let mut removed = 0;
        for channel in self.registry.stale_channels(self.stale_timeout) {
            if self.registry.deregister(&channel.id, CloseReason::TimedOut) {
                removed += 1;
            }
        }
        let windows = self.rate_limiter.purge_stale();
        self.registry.prune_recent_disconnects();

        if removed > 0 {
            warn!(removed, "Pruned stale channels");
        }
        debug!(
            removed,
            purged_windows = windows,
            active = self.registry.len(),
            "Heartbeat sweep tick"
        );
        removed
    }

    /// Starts the background task.
    pub fn spawn(self: Arc<Self>) -> HeartbeatHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        HeartbeatHandle { cancel, task }
    }

    async fn run(&self, cancel: CancellationToken) {
        let start = Instant::now();
        let mut ping = time::interval_at(start + self.heartbeat_interval, self.heartbeat_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweep = time::interval_at(start + self.sweep_interval, self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            heartbeat_secs = self.heartbeat_interval.as_secs(),
            sweep_secs = self.sweep_interval.as_secs(),
            stale_timeout_secs = self.stale_timeout.as_secs(),
            "Heartbeat scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ping.tick() => {
                    self.ping_all();
                }
                _ = sweep.tick() => {
                    self.sweep_stale();
                }
            }
        }

        info!("Heartbeat scheduler stopped");
    }
}

/// Cancellation handle for a spawned [`HeartbeatScheduler`].
#[derive(Debug)]
pub struct HeartbeatHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Requests the task to stop after its current tick.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the task and waits for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Heartbeat task ended abnormally");
        }
    }
}
