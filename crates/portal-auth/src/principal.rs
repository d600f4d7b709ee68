//! Authenticated principal and role enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use portal_core::AppError;

/// Roles a portal principal can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Portal administrator.
    Admin,
    /// School office staff.
    Staff,
    /// Teaching staff.
    Teacher,
    /// Enrolled student.
    Student,
    /// Parent or guardian.
    Parent,
    /// Internal service-to-service caller.
    Service,
}

impl Role {
    /// Whether the role may see aggregate connection statistics.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether the role may trigger pushes to other users.
    pub fn can_push(&self) -> bool {
        matches!(self, Self::Admin | Self::Service)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Teacher => "teacher",
            Self::Student => "student",
            Self::Parent => "parent",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            "parent" => Ok(Self::Parent),
            "service" => Ok(Self::Service),
            _ => Err(AppError::validation(format!(
                "Invalid role: '{s}'. Expected one of: admin, staff, teacher, student, parent, service"
            ))),
        }
    }
}

/// The resolved identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque user identity.
    pub user_id: String,
    /// Role at the time the credential was issued.
    pub role: Role,
    /// Display name, when the credential carries one.
    pub name: Option<String>,
}

impl Principal {
    /// Creates a principal without a display name.
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admin_is_elevated() {
        assert!(Role::Admin.is_elevated());
        assert!(!Role::Service.is_elevated());
        assert!(!Role::Teacher.is_elevated());
    }

    #[test]
    fn test_push_roles() {
        assert!(Role::Admin.can_push());
        assert!(Role::Service.can_push());
        assert!(!Role::Parent.can_push());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("SERVICE".parse::<Role>().unwrap(), Role::Service);
        assert!("janitor".parse::<Role>().is_err());
    }
}
