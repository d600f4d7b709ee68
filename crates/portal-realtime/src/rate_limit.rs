//! Sliding-window admission control for new channels.
//!
//! Each (principal, origin) pair gets one window. The first attempt opens a
//! window; further attempts inside it are counted against the ceiling; the
//! first attempt after it expires opens a fresh one. Windows that see no
//! attempt for twice the window length are dropped by [`RateLimiter::purge_stale`].

use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use portal_core::config::RateLimitConfig;

/// Composite key of principal identity and network origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// Principal identity.
    pub user_id: String,
    /// Best-effort client address.
    pub origin: String,
}

impl RateLimitKey {
    /// Creates a key.
    pub fn new(user_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            origin: origin.into(),
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user_id, self.origin)
    }
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Admission counted and allowed.
    Allowed,
    /// Ceiling reached for the current window.
    Denied {
        /// Whole seconds until the window rolls over, never zero.
        retry_after_secs: u64,
    },
}

impl RateLimitDecision {
    /// Whether the attempt was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
    last_attempt: Instant,
}

/// Per-key sliding-window counter table.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<RateLimitKey, Window>,
    window: Duration,
    max_per_window: u32,
    sweep_threshold: usize,
}

impl RateLimiter {
    /// Creates a limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            window: config.window(),
            max_per_window: config.max_per_window,
            sweep_threshold: config.sweep_threshold,
        }
    }

    /// Counts an admission attempt for `key`.
    pub fn admit(&self, key: &RateLimitKey) -> RateLimitDecision {
        if self.sweep_threshold > 0 && self.windows.len() >= self.sweep_threshold {
            self.purge_stale();
        }

        let now = Instant::now();
        let mut entry = self.windows.entry(key.clone()).or_insert(Window {
            count: 0,
            started_at: now,
            last_attempt: now,
        });
        let window = entry.value_mut();
        window.last_attempt = now;

        let age = now.duration_since(window.started_at);
        if window.count == 0 || age >= self.window {
            window.count = 1;
            window.started_at = now;
            return RateLimitDecision::Allowed;
        }

        if window.count < self.max_per_window {
            window.count += 1;
            return RateLimitDecision::Allowed;
        }

        let remaining = self.window.saturating_sub(age);
        let mut retry_after_secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            retry_after_secs += 1;
        }
        RateLimitDecision::Denied {
            retry_after_secs: retry_after_secs.max(1),
        }
    }

    /// Drops windows with no attempt for twice the window length.
    ///
    /// Returns the number of windows removed.
    pub fn purge_stale(&self) -> usize {
        let idle_limit = self.window * 2;
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.duration_since(w.last_attempt) <= idle_limit);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, remaining = self.windows.len(), "Purged idle rate-limit windows");
        }
        removed
    }

    /// Number of tracked windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no windows are tracked.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
