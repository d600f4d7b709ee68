//! Role checks for route guarding.

use portal_core::error::AppError;

use crate::extractors::AuthUser;

/// Checks that the caller may trigger pushes (admin or service).
pub fn require_push(auth: &AuthUser) -> Result<(), AppError> {
    if !auth.role.can_push() {
        return Err(AppError::authorization(
            "Push trigger requires an admin or service principal",
        ));
    }
    Ok(())
}

/// Whether the caller may see engine-wide statistics.
pub fn is_elevated(auth: &AuthUser) -> bool {
    auth.role.is_elevated()
}
