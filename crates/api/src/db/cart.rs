//! Cart line repository.
//!
//! The merge-on-add invariant (at most one line per (user, item)) is enforced
//! here by a single upsert against the `cart_lines_user_item_unique`
//! constraint, so two concurrent adds of the same item serialize on the row
//! instead of both observing "no existing line".

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use thimble_core::{CartLineId, ItemId, UserId};

use super::RepositoryError;
use crate::models::{CartEntry, Item};

const ENTRY_SELECT: &str = "SELECT cl.id, cl.user_id, cl.quantity,
            i.id AS item_id, i.owner_id AS item_owner_id, i.title, i.description,
            i.price, i.image, i.large_image, i.created_at
     FROM cart_lines cl
     LEFT JOIN items i ON i.id = cl.item_id";

/// Repository for cart line operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add one unit of `item_id` to the user's cart.
    ///
    /// Inserts a quantity-1 line, or bumps the existing line's quantity by
    /// one if the (user, item) pair already has one. Both paths are the same
    /// atomic statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    pub async fn add_one(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<CartEntry, RepositoryError> {
        let line_id: CartLineId = sqlx::query(
            "INSERT INTO cart_lines (user_id, item_id)
             VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT cart_lines_user_item_unique
             DO UPDATE SET quantity = cart_lines.quantity + 1
             RETURNING id",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?
        .try_get("id")?;

        self.get_entry(line_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Load one cart line with its (possibly deleted) item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_entry(
        &self,
        line_id: CartLineId,
    ) -> Result<Option<CartEntry>, RepositoryError> {
        let row = sqlx::query(&format!("{ENTRY_SELECT} WHERE cl.id = $1"))
            .bind(line_id)
            .fetch_optional(self.pool)
            .await?;

        row.map(map_entry).transpose()
    }

    /// Load a user's full cart, oldest line first.
    ///
    /// Lines whose item has since been deleted come back with `item: None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load_cart(&self, user_id: UserId) -> Result<Vec<CartEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{ENTRY_SELECT} WHERE cl.user_id = $1 ORDER BY cl.id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(map_entry).collect()
    }

    /// Delete one cart line.
    ///
    /// The ownership check happens in the service layer before this call.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    pub async fn delete_line(&self, line_id: CartLineId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1")
            .bind(line_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

fn map_entry(row: PgRow) -> Result<CartEntry, RepositoryError> {
    let item_id: Option<ItemId> = row.try_get("item_id")?;
    let item = match item_id {
        Some(id) => Some(Item {
            id,
            owner_id: row.try_get("item_owner_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            image: row.try_get("image")?,
            large_image: row.try_get("large_image")?,
            created_at: row.try_get("created_at")?,
        }),
        None => None,
    };

    Ok(CartEntry {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        quantity: row.try_get("quantity")?,
        item,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use thimble_core::{Email, PermissionSet};

    use crate::db::users::UserRepository;

    use super::*;

    /// Connects to the database named by `DATABASE_URL` and applies
    /// migrations. The tests below need a disposable Postgres, so they are
    /// ignored by default; run them with `cargo test -- --ignored`.
    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    async fn seed_user_and_item(pool: &PgPool) -> (UserId, ItemId) {
        let email =
            Email::parse(&format!("shopper-{}@example.com", rand::random::<u32>())).unwrap();
        let user = UserRepository::new(pool)
            .create("Shopper", &email, "hash", &PermissionSet::default_user())
            .await
            .unwrap();

        let item_id: ItemId = sqlx::query(
            "INSERT INTO items (owner_id, title, description, price)
             VALUES ($1, 'wool socks', 'warm', 500)
             RETURNING id",
        )
        .bind(user.id)
        .fetch_one(pool)
        .await
        .unwrap()
        .try_get("id")
        .unwrap();

        (user.id, item_id)
    }

    #[tokio::test]
    #[ignore = "needs a disposable Postgres via DATABASE_URL"]
    async fn test_adding_same_item_twice_merges_into_one_line() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let (user_id, item_id) = seed_user_and_item(&pool).await;

        let first = repo.add_one(user_id, item_id).await.unwrap();
        assert_eq!(first.quantity, 1);

        // The second add bumps the existing line instead of creating one.
        let second = repo.add_one(user_id, item_id).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.quantity, 2);

        let cart = repo.load_cart(user_id).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 2);
    }

    #[tokio::test]
    #[ignore = "needs a disposable Postgres via DATABASE_URL"]
    async fn test_adding_unknown_item_is_not_found() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let (user_id, _) = seed_user_and_item(&pool).await;

        let err = repo
            .add_one(user_id, ItemId::new(i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
