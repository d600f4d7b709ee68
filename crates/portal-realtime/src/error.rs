//! Admission and delivery errors for the push core.

use thiserror::Error;

use portal_core::error::AppError;

/// Reasons a new channel is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// Too many connection attempts for this principal and origin.
    #[error("Too many connection attempts, retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the current window rolls over.
        retry_after_secs: u64,
    },
    /// The global channel ceiling is reached.
    #[error("Connection capacity of {limit} channels reached")]
    CapacityExceeded {
        /// Configured ceiling.
        limit: usize,
    },
    /// The engine is shutting down and accepts no new channels.
    #[error("Push service is shutting down")]
    ShuttingDown,
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::RateLimited { retry_after_secs } => {
                AppError::rate_limited(err.to_string(), retry_after_secs)
            }
            AdmissionError::CapacityExceeded { .. } => AppError::capacity_exceeded(err.to_string()),
            AdmissionError::ShuttingDown => AppError::service_unavailable(err.to_string()),
        }
    }
}

/// A frame could not be queued on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The client is not draining its queue.
    #[error("channel send queue is full")]
    QueueFull,
    /// The transport side of the channel is gone.
    #[error("channel is closed")]
    Closed,
}
