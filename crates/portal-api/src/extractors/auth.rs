//! `AuthUser` extractor: pulls the access token from the request, validates
//! it through the configured authenticator, and injects the principal.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use portal_auth::Principal;
use portal_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl std::ops::Deref for AuthUser {
    type Target = Principal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `?token=` fallback for clients that cannot set headers (`EventSource`).
#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Returns the bearer token from the `Authorization` header or the query.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        let value = header
            .to_str()
            .map_err(|_| AppError::authentication("Invalid Authorization header"))?;
        return value
            .strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"));
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::authentication("Missing access token"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let principal = state.authenticator.authenticate(&token).await?;
        Ok(AuthUser(principal))
    }
}
