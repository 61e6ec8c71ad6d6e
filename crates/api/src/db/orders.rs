//! Order repository.
//!
//! Order materialization is the one multi-statement write in the system: the
//! order row, its line snapshots, and the removal of the charged cart lines
//! commit or roll back together. The payment capture preceding it cannot be
//! rolled back, which is why the caller treats a failure here as a dangling
//! charge rather than a plain database error.

use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use thimble_core::{CartLineId, Cents, OrderId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderLine, OrderLineSnapshot};

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist an order with its line snapshots and clear the charged cart
    /// lines, all in one transaction.
    ///
    /// Cart lines are deleted by the exact id set the checkout read, not by
    /// re-querying the cart, so lines added concurrently survive untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// persisted in that case.
    pub async fn create_with_lines(
        &self,
        user_id: UserId,
        total: Cents,
        charge: &str,
        lines: &[OrderLineSnapshot],
        charged_cart_line_ids: &[CartLineId],
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order_row = sqlx::query(
            "INSERT INTO orders (user_id, total, charge)
             VALUES ($1, $2, $3)
             RETURNING id, user_id, total, charge, created_at",
        )
        .bind(user_id)
        .bind(total)
        .bind(charge)
        .fetch_one(&mut *tx)
        .await?;

        let order_id: OrderId = order_row.try_get("id")?;

        let mut order_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let row = sqlx::query(
                "INSERT INTO order_lines (order_id, title, description, price, image, quantity)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id, title, description, price, image, quantity",
            )
            .bind(order_id)
            .bind(&line.title)
            .bind(&line.description)
            .bind(line.price)
            .bind(&line.image)
            .bind(line.quantity)
            .fetch_one(&mut *tx)
            .await?;

            order_lines.push(map_order_line(row)?);
        }

        let ids: Vec<i64> = charged_cart_line_ids.iter().map(|id| id.as_i64()).collect();
        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut order = map_order(order_row)?;
        order.lines = order_lines;
        Ok(order)
    }

    /// Get one of a user's orders with its lines.
    ///
    /// Scoped by owner: another user's order id comes back as `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, total, charge, created_at
             FROM orders WHERE id = $1 AND user_id = $2",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut order = map_order(row)?;
        order.lines = self.lines_for(&[order.id]).await?.remove(&order.id).unwrap_or_default();
        Ok(Some(order))
    }

    /// List a user's orders, newest first, each with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, total, charge, created_at
             FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let mut orders = rows
            .into_iter()
            .map(map_order)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut lines = self.lines_for(&ids).await?;
        for order in &mut orders {
            order.lines = lines.remove(&order.id).unwrap_or_default();
        }

        Ok(orders)
    }

    /// Fetch lines for a set of orders, grouped by order id.
    async fn lines_for(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<i64> = order_ids.iter().map(|id| id.as_i64()).collect();
        let rows = sqlx::query(
            "SELECT id, order_id, title, description, price, image, quantity
             FROM order_lines WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let order_id: OrderId = row.try_get("order_id")?;
            grouped.entry(order_id).or_default().push(map_order_line(row)?);
        }

        Ok(grouped)
    }
}

fn map_order(row: PgRow) -> Result<Order, RepositoryError> {
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        total: row.try_get("total")?,
        charge: row.try_get("charge")?,
        created_at: row.try_get("created_at")?,
        lines: Vec::new(),
    })
}

fn map_order_line(row: PgRow) -> Result<OrderLine, RepositoryError> {
    Ok(OrderLine {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image: row.try_get("image")?,
        quantity: row.try_get("quantity")?,
    })
}
