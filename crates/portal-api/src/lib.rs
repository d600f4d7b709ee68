//! # portal-api
//!
//! HTTP layer for the portal notification service built on Axum.
//!
//! Provides the event-stream endpoint, the internal push trigger, the
//! statistics and health endpoints, middleware (request logging, CORS),
//! the authenticated-principal extractor, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
