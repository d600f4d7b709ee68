//! Real-time push channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (event stream) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum open channels per user; the oldest is evicted beyond this.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Maximum open channels across all users.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Per-channel outbound queue size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Keep-alive frame interval in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Stale-channel sweep interval in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Channels not refreshed within this many seconds are pruned.
    #[serde(default = "default_stale_timeout")]
    pub stale_timeout_seconds: u64,
    /// A registration within this many seconds of the same user's last
    /// disconnect counts as a reconnection.
    #[serde(default = "default_reconnect_window")]
    pub reconnect_window_seconds: u64,
    /// Failure ratio above which a single fan-out is logged as degraded.
    #[serde(default = "default_failure_warn_ratio")]
    pub failure_warn_ratio: f64,
    /// Minimum attempts in a fan-out before the failure ratio is considered.
    #[serde(default = "default_failure_warn_min_attempts")]
    pub failure_warn_min_attempts: usize,
    /// Connection-churn rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            max_connections: default_max_connections(),
            channel_buffer_size: default_channel_buffer(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            sweep_interval_seconds: default_sweep_interval(),
            stale_timeout_seconds: default_stale_timeout(),
            reconnect_window_seconds: default_reconnect_window(),
            failure_warn_ratio: default_failure_warn_ratio(),
            failure_warn_min_attempts: default_failure_warn_min_attempts(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl RealtimeConfig {
    /// Keep-alive interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds.max(1))
    }

    /// Stale sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }

    /// Staleness timeout as a `Duration`.
    pub fn stale_timeout(&self) -> Duration {
        Duration::from_secs(self.stale_timeout_seconds)
    }

    /// Reconnection window as a `Duration`.
    pub fn reconnect_window(&self) -> Duration {
        Duration::from_secs(self.reconnect_window_seconds)
    }
}

/// Sliding-window admission settings, keyed by principal and network origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    /// Admissions allowed per key within one window.
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,
    /// Window table size that triggers an inline sweep of idle windows.
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window(),
            max_per_window: default_max_per_window(),
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

impl RateLimitConfig {
    /// Window length as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds.max(1))
    }
}

fn default_max_connections_per_user() -> usize {
    3
}

fn default_max_connections() -> usize {
    1000
}

fn default_channel_buffer() -> usize {
    64
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_stale_timeout() -> u64 {
    300
}

fn default_reconnect_window() -> u64 {
    60
}

fn default_failure_warn_ratio() -> f64 {
    0.5
}

fn default_failure_warn_min_attempts() -> usize {
    4
}

fn default_window() -> u64 {
    60
}

fn default_max_per_window() -> u32 {
    10
}

fn default_sweep_threshold() -> usize {
    10_000
}
