//! Catalog and permission-administration service.
//!
//! All capability decisions for item mutations and user administration live
//! here, above the repositories. One decision is pure and tested directly:
//! who may delete an item.

use sqlx::PgPool;

use thimble_core::{Cents, ItemId, Permission, PermissionSet, UserId};

use crate::db::RepositoryError;
use crate::db::items::{ItemChanges, ItemRepository};
use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::models::{Item, User};
use crate::services::guard::{require_permission, require_user};

/// Permissions that allow deleting an item one doesn't own.
const DELETE_OVERRIDES: &[Permission] = &[Permission::Admin, Permission::ItemDelete];

/// Permissions required for user administration.
const USER_ADMIN: &[Permission] = &[Permission::Admin, Permission::PermissionUpdate];

/// Fields for a new catalog item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub price: Cents,
    pub image: Option<String>,
    pub large_image: Option<String>,
}

/// Catalog mutation and user-administration service.
pub struct CatalogService<'a> {
    items: ItemRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            items: ItemRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// Create an item owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` without an identity.
    pub async fn create_item(&self, caller: Option<&User>, new: NewItem) -> Result<Item, AppError> {
        let caller = require_user(caller)?;

        let item = self
            .items
            .create(
                caller.id,
                &new.title,
                &new.description,
                new.price,
                new.image.as_deref(),
                new.large_image.as_deref(),
            )
            .await?;

        tracing::info!(item_id = %item.id, owner_id = %caller.id, "Item created");
        Ok(item)
    }

    /// Apply field updates to an item.
    ///
    /// Performs no identity or ownership check; the update payload cannot
    /// carry an id, so the target cannot be re-pointed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the item doesn't exist.
    pub async fn update_item(&self, id: ItemId, changes: ItemChanges) -> Result<Item, AppError> {
        let item = self.items.update(id, changes).await.map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("no item with id {id}")),
            other => AppError::Database(other),
        })?;

        Ok(item)
    }

    /// Delete an item the caller owns, or any item if the caller holds a
    /// delete-override permission. Returns the prior record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` without an identity,
    /// `AppError::NotFound` if the item doesn't exist, and
    /// `AppError::Forbidden` if the caller neither owns it nor may override.
    pub async fn delete_item(&self, caller: Option<&User>, id: ItemId) -> Result<Item, AppError> {
        let caller = require_user(caller)?;

        let item = self
            .items
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no item with id {id}")))?;

        if !can_delete(caller.id, &caller.permissions, item.owner_id) {
            return Err(AppError::Forbidden);
        }

        let deleted = self.items.delete(id).await.map_err(|e| match e {
            // Lost a race with another delete.
            RepositoryError::NotFound => AppError::NotFound(format!("no item with id {id}")),
            other => AppError::Database(other),
        })?;

        tracing::info!(item_id = %id, caller_id = %caller.id, "Item deleted");
        Ok(deleted)
    }

    /// Replace a user's permission set wholesale with `permissions`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless the caller holds an
    /// administration permission, `AppError::NotFound` for an unknown target.
    pub async fn update_permissions(
        &self,
        caller: Option<&User>,
        target: UserId,
        permissions: PermissionSet,
    ) -> Result<User, AppError> {
        let caller = require_permission(caller, USER_ADMIN)?;

        let user = self
            .users
            .set_permissions(target, &permissions)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    AppError::NotFound(format!("no user with id {target}"))
                }
                other => AppError::Database(other),
            })?;

        tracing::info!(
            target_id = %target,
            caller_id = %caller.id,
            permissions = ?user.permissions,
            "Permissions replaced"
        );
        Ok(user)
    }

    /// List every user. Administration-gated.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` unless the caller holds an
    /// administration permission.
    pub async fn list_users(&self, caller: Option<&User>) -> Result<Vec<User>, AppError> {
        require_permission(caller, USER_ADMIN)?;
        Ok(self.users.list_all().await?)
    }
}

/// Pure deletion decision: owner, or holder of an override permission.
fn can_delete(caller_id: UserId, caller_permissions: &PermissionSet, owner_id: UserId) -> bool {
    caller_id == owner_id || caller_permissions.intersects(DELETE_OVERRIDES)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn perms(list: &[Permission]) -> PermissionSet {
        PermissionSet::new(list.to_vec()).unwrap()
    }

    #[test]
    fn test_owner_can_delete() {
        assert!(can_delete(
            UserId::new(1),
            &perms(&[Permission::User]),
            UserId::new(1)
        ));
    }

    #[test]
    fn test_stranger_cannot_delete() {
        assert!(!can_delete(
            UserId::new(2),
            &perms(&[Permission::User]),
            UserId::new(1)
        ));
    }

    #[test]
    fn test_admin_can_delete_others() {
        assert!(can_delete(
            UserId::new(2),
            &perms(&[Permission::Admin]),
            UserId::new(1)
        ));
    }

    #[test]
    fn test_item_delete_permission_can_delete_others() {
        assert!(can_delete(
            UserId::new(2),
            &perms(&[Permission::User, Permission::ItemDelete]),
            UserId::new(1)
        ));
    }

    #[test]
    fn test_item_create_permission_does_not_allow_delete() {
        assert!(!can_delete(
            UserId::new(2),
            &perms(&[Permission::ItemCreate]),
            UserId::new(1)
        ));
    }
}
