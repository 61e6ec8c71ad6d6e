//! Database access for the Thimble `PostgreSQL` instance.
//!
//! # Tables
//!
//! - `users` - identities, password hashes, permission sets, reset tokens
//! - `items` - the catalog
//! - `cart_lines` - pending carts, one row per (user, item)
//! - `orders` / `order_lines` - completed purchases and their snapshots
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and run on startup via
//! `sqlx::migrate!`.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod cart;
pub mod items;
pub mod orders;
pub mod users;

/// Errors surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The underlying query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced row does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness or foreign-key constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value failed to parse back into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
