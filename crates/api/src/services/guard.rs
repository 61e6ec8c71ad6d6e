//! Capability guard for protected operations.
//!
//! The rule everywhere: a missing identity is `Unauthorized`, an identity
//! whose permission set does not intersect the required set is `Forbidden`.
//! Handlers call this before touching anything.

use thimble_core::Permission;

use crate::error::AppError;
use crate::models::User;

/// Require an identity, any identity.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if there is none.
pub fn require_user(user: Option<&User>) -> Result<&User, AppError> {
    user.ok_or(AppError::Unauthorized)
}

/// Require an identity holding at least one of `required`.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` with no identity, `AppError::Forbidden`
/// when the identity's permissions don't intersect `required`.
pub fn require_permission<'a>(
    user: Option<&'a User>,
    required: &[Permission],
) -> Result<&'a User, AppError> {
    let user = require_user(user)?;
    if user.permissions.intersects(required) {
        Ok(user)
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use thimble_core::{Email, PermissionSet, UserId};

    use super::*;

    fn user_with(permissions: &[Permission]) -> User {
        User {
            id: UserId::new(1),
            name: "Edda".to_owned(),
            email: Email::parse("edda@example.com").unwrap(),
            permissions: PermissionSet::new(permissions.to_vec()).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_identity_is_unauthorized() {
        assert!(matches!(
            require_user(None).unwrap_err(),
            AppError::Unauthorized
        ));
        assert!(matches!(
            require_permission(None, &[Permission::Admin]).unwrap_err(),
            AppError::Unauthorized
        ));
    }

    #[test]
    fn test_any_overlap_satisfies() {
        let user = user_with(&[Permission::User, Permission::ItemDelete]);
        assert!(
            require_permission(Some(&user), &[Permission::Admin, Permission::ItemDelete]).is_ok()
        );
    }

    #[test]
    fn test_no_overlap_is_forbidden() {
        let user = user_with(&[Permission::User]);
        assert!(matches!(
            require_permission(Some(&user), &[Permission::Admin, Permission::PermissionUpdate])
                .unwrap_err(),
            AppError::Forbidden
        ));
    }

    #[test]
    fn test_admin_passes_everywhere() {
        let user = user_with(&[Permission::Admin]);
        assert!(require_permission(Some(&user), &[Permission::Admin]).is_ok());
        assert!(
            require_permission(Some(&user), &[Permission::Admin, Permission::ItemUpdate]).is_ok()
        );
    }
}
