//! Route definitions for the portal notification API.
//!
//! All routes are mounted under `/api`. The router receives `AppState` and
//! passes it to every handler via Axum's `State` extractor.

use axum::Router;
use axum::routing::{get, post};

use crate::handlers;
use crate::state::AppState;

/// Builds the route table.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(notification_routes())
        .merge(health_routes());

    Router::new().nest("/api", api_routes).with_state(state)
}

/// Event stream, push trigger and statistics.
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications/stream",
            get(handlers::stream::open_stream),
        )
        .route("/notifications/push", post(handlers::push::push))
        .route("/notifications/stats", get(handlers::stats::stats))
}

/// Liveness.
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
