//! JWT claims carried by portal access tokens.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::{Principal, Role};

/// JWT claims payload embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user ID.
    pub sub: String,
    /// User role at the time of token issuance.
    pub role: Role,
    /// Display name for convenience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Builds claims for a subject valid for `ttl` from now.
    pub fn new(sub: impl Into<String>, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.into(),
            role,
            name: None,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Converts the claims into the principal they identify.
    pub fn into_principal(self) -> Principal {
        Principal {
            user_id: self.sub,
            role: self.role,
            name: self.name,
        }
    }
}
