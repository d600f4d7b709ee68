//! Internal push trigger.

use axum::Json;
use axum::extract::State;
use tracing::info;
use validator::Validate;

use portal_core::error::AppError;
use portal_realtime::notification::persistence::persist_for_users;

use crate::dto::request::PushRequest;
use crate::dto::response::{ApiResponse, PushResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::middleware::rbac::require_push;
use crate::state::AppState;

/// POST /api/notifications/push
///
/// Fans a payload out to the listed users' channels, or to every channel
/// with `broadcast: true`. Returns how many channels were attempted; it
/// never waits on clients.
pub async fn push(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PushRequest>,
) -> Result<Json<ApiResponse<PushResponse>>, ApiError> {
    require_push(&auth)?;
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let dispatcher = &state.engine.dispatcher;
    let mut persisted = 0;
    let mut persist_failed = 0;

    let report = match req.target_user_ids() {
        Some(mut user_ids) => {
            if req.persist {
                let written =
                    persist_for_users(state.store.as_ref(), &user_ids, &req.to_new_notification())
                        .await?;
                persisted = written.records.len();
                persist_failed = written.failed.len();
                // Only users holding a record are pushed, so every live
                // frame can be marked read later.
                user_ids = written.persisted_user_ids();
            }
            dispatcher.send_to_users(&user_ids, &req.notification)
        }
        None => dispatcher.broadcast(&req.notification),
    };

    info!(
        caller = %auth.user_id,
        broadcast = req.broadcast,
        attempted = report.attempted,
        delivered = report.delivered,
        persisted,
        persist_failed,
        "Push triggered"
    );

    Ok(Json(ApiResponse::ok(PushResponse {
        attempted: report.attempted,
        delivered: report.delivered,
        persisted,
        persist_failed,
    })))
}
