//! Cart service.
//!
//! Thin by intent: the merge-on-add race is settled by the repository's
//! upsert, so this layer only resolves identity and ownership.

use sqlx::PgPool;

use thimble_core::{CartLineId, ItemId};

use crate::db::RepositoryError;
use crate::db::cart::CartRepository;
use crate::error::AppError;
use crate::models::{CartEntry, User};
use crate::services::guard::require_user;

/// Cart mutation and read service.
pub struct CartService<'a> {
    cart: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            cart: CartRepository::new(pool),
        }
    }

    /// Add one unit of `item_id` to the caller's cart, merging into an
    /// existing line when there is one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` without an identity and
    /// `AppError::NotFound` for an unknown item.
    pub async fn add_to_cart(
        &self,
        caller: Option<&User>,
        item_id: ItemId,
    ) -> Result<CartEntry, AppError> {
        let caller = require_user(caller)?;

        let entry = self
            .cart
            .add_one(caller.id, item_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    AppError::NotFound(format!("no item with id {item_id}"))
                }
                other => AppError::Database(other),
            })?;

        tracing::debug!(
            user_id = %caller.id,
            item_id = %item_id,
            quantity = entry.quantity,
            "Cart line upserted"
        );
        Ok(entry)
    }

    /// Remove one of the caller's cart lines entirely, whatever its quantity.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown line and
    /// `AppError::Forbidden` when the line belongs to someone else.
    pub async fn remove_from_cart(
        &self,
        caller: Option<&User>,
        line_id: CartLineId,
    ) -> Result<CartEntry, AppError> {
        let caller = require_user(caller)?;

        let entry = self
            .cart
            .get_entry(line_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no cart line with id {line_id}")))?;

        if entry.user_id != caller.id {
            return Err(AppError::Forbidden);
        }

        match self.cart.delete_line(line_id).await {
            Ok(()) => {}
            // Deleted out from under us; removal is still the outcome.
            Err(RepositoryError::NotFound) => {}
            Err(other) => return Err(AppError::Database(other)),
        }

        Ok(entry)
    }

    /// Load the caller's cart, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` without an identity.
    pub async fn load_cart(&self, caller: Option<&User>) -> Result<Vec<CartEntry>, AppError> {
        let caller = require_user(caller)?;
        Ok(self.cart.load_cart(caller.id).await?)
    }
}
