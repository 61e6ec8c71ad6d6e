//! Catalog item repository.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use thimble_core::{Cents, ItemId, UserId};

use super::RepositoryError;
use crate::models::Item;

const ITEM_COLUMNS: &str = "id, owner_id, title, description, price, image, large_image, created_at";

/// Partial update for an item. The id is never part of the payload, so it
/// cannot be rewritten through this path.
#[derive(Debug, Default, Clone)]
pub struct ItemChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
    pub image: Option<String>,
    pub large_image: Option<String>,
}

/// Repository for catalog item operations.
pub struct ItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an item (including its owner id) by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(map_item).transpose()
    }

    /// Create an item owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner_id: UserId,
        title: &str,
        description: &str,
        price: Cents,
        image: Option<&str>,
        large_image: Option<&str>,
    ) -> Result<Item, RepositoryError> {
        let row = sqlx::query(&format!(
            "INSERT INTO items (owner_id, title, description, price, image, large_image)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(image)
        .bind(large_image)
        .fetch_one(self.pool)
        .await?;

        map_item(row)
    }

    /// Apply field updates to an item. Absent fields keep their value; the
    /// owner is never touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    pub async fn update(&self, id: ItemId, changes: ItemChanges) -> Result<Item, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE items
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 price = COALESCE($4, price),
                 image = COALESCE($5, image),
                 large_image = COALESCE($6, large_image)
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.image)
        .bind(changes.large_image)
        .fetch_optional(self.pool)
        .await?;

        row.map(map_item).transpose()?.ok_or(RepositoryError::NotFound)
    }

    /// Delete an item, returning the prior record.
    ///
    /// Cart lines referencing it fall back to NULL via the schema's
    /// `ON DELETE SET NULL`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    pub async fn delete(&self, id: ItemId) -> Result<Item, RepositoryError> {
        let row = sqlx::query(&format!(
            "DELETE FROM items WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(map_item).transpose()?.ok_or(RepositoryError::NotFound)
    }
}

pub(super) fn map_item(row: PgRow) -> Result<Item, RepositoryError> {
    Ok(Item {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image: row.try_get("image")?,
        large_image: row.try_get("large_image")?,
        created_at: row.try_get("created_at")?,
    })
}
