//! Request authentication seam.

use async_trait::async_trait;
use tracing::debug;

use portal_core::config::AuthConfig;
use portal_core::error::AppError;

use crate::jwt::JwtDecoder;
use crate::principal::Principal;

/// Resolves a bearer credential into a [`Principal`].
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token` and returns the principal it identifies.
    async fn authenticate(&self, token: &str) -> Result<Principal, AppError>;
}

/// Authenticates HS256 JWT access tokens.
#[derive(Debug, Clone)]
pub struct JwtAuthenticator {
    /// JWT decoder.
    decoder: JwtDecoder,
}

impl JwtAuthenticator {
    /// Creates a new authenticator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoder: JwtDecoder::new(config),
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Principal, AppError> {
        let claims = self.decoder.decode(token)?;
        if claims.sub.trim().is_empty() {
            return Err(AppError::authentication("Token subject is empty"));
        }

        debug!(user_id = %claims.sub, role = %claims.role, "Token authenticated");
        Ok(claims.into_principal())
    }
}
