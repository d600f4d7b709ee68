//! Notification and connection statistics.

use axum::Json;
use axum::extract::{Query, State};

use crate::dto::request::StatsQuery;
use crate::dto::response::{ApiResponse, StatsResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::middleware::rbac::is_elevated;
use crate::state::AppState;

/// GET /api/notifications/stats?detailed=true
///
/// Every caller gets their own counts. Elevated callers also get the engine
/// snapshot and, with `detailed=true`, the per-channel listing.
pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<StatsResponse>>, ApiError> {
    let notifications = state.store.count_for_user(&auth.user_id).await?;
    let engine = &state.engine;
    let elevated = is_elevated(&auth);

    Ok(Json(ApiResponse::ok(StatsResponse {
        notifications,
        user_connections: engine.registry.user_connection_count(&auth.user_id),
        aggregate: elevated.then(|| engine.stats.snapshot()),
        channels: (elevated && query.detailed).then(|| engine.stats.channels()),
    })))
}
