//! User repository.
//!
//! Owns everything credential-shaped: password hashes and reset tokens are
//! read and written here and nowhere else. Queries are bound at runtime and
//! rows are mapped back into domain types explicitly, so a corrupt stored
//! permission token or email surfaces as `DataCorruption` instead of leaking
//! onward.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use thimble_core::{Email, PermissionSet, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, permissions, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails and
    /// `RepositoryError::DataCorruption` if a stored value fails to parse.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(map_user).transpose()
    }

    /// Get a user by their (normalized) email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails and
    /// `RepositoryError::DataCorruption` if a stored value fails to parse.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(map_user).transpose()
    }

    /// List every user.
    ///
    /// The capability check for this privileged read happens in the service
    /// layer; the repository just reads.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(map_user).collect()
    }

    /// Create a user with a hashed password and an initial permission set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    pub async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
        permissions: &PermissionSet,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (name, email, password_hash, permissions)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(permissions.tokens())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        map_user(row)
    }

    /// Get a user along with their password hash, for credential checks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails and
    /// `RepositoryError::DataCorruption` if a stored value fails to parse.
    pub async fn get_auth_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let password_hash: String = row.try_get("password_hash")?;
        let user = map_user(row)?;

        Ok(Some((user, password_hash)))
    }

    /// Replace a user's permission set wholesale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_permissions(
        &self,
        id: UserId,
        permissions: &PermissionSet,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET permissions = $2, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(permissions.tokens())
        .fetch_optional(self.pool)
        .await?;

        row.map(map_user).transpose()?.ok_or(RepositoryError::NotFound)
    }

    /// Attach a reset token and expiry to the account behind `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account matches the email.
    pub async fn set_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE users
             SET reset_token = $2, reset_token_expires_at = $3, updated_at = now()
             WHERE email = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(token)
        .bind(expires_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(map_user).transpose()?.ok_or(RepositoryError::NotFound)
    }

    /// Atomically consume a live reset token: set the new password hash and
    /// clear the token/expiry pair in one statement.
    ///
    /// Two concurrent resets race on this single UPDATE; exactly one matches
    /// the still-set token. Returns `None` when the token is unknown, already
    /// consumed, or expired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails and
    /// `RepositoryError::DataCorruption` if a stored value fails to parse.
    pub async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE users
             SET password_hash = $2, reset_token = NULL, reset_token_expires_at = NULL,
                 updated_at = now()
             WHERE reset_token = $1 AND reset_token_expires_at > now()
             RETURNING {USER_COLUMNS}"
        ))
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(self.pool)
        .await?;

        row.map(map_user).transpose()
    }
}

/// Map a row onto the domain `User`, validating stored email and permissions.
fn map_user(row: PgRow) -> Result<User, RepositoryError> {
    let email: String = row.try_get("email")?;
    let email = Email::parse(&email)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;

    let tokens: Vec<String> = row.try_get("permissions")?;
    let permissions = PermissionSet::from_tokens(tokens).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid permissions in database: {e}"))
    })?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email,
        permissions,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

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

    fn unique_email(prefix: &str) -> Email {
        Email::parse(&format!("{prefix}-{}@example.com", rand::random::<u32>())).unwrap()
    }

    fn unique_token() -> String {
        format!("tok-{}", rand::random::<u64>())
    }

    #[tokio::test]
    #[ignore = "needs a disposable Postgres via DATABASE_URL"]
    async fn test_reset_token_is_single_use() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);

        let email = unique_email("freya");
        repo.create("Freya", &email, "old-hash", &PermissionSet::default_user())
            .await
            .unwrap();

        let token = unique_token();
        repo.set_reset_token(&email, &token, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        let first = repo.consume_reset_token(&token, "new-hash").await.unwrap();
        assert!(first.is_some());

        // Consumption cleared the token; the same one must not work twice.
        let second = repo
            .consume_reset_token(&token, "other-hash")
            .await
            .unwrap();
        assert!(second.is_none());

        let (_, hash) = repo.get_auth_by_email(&email).await.unwrap().unwrap();
        assert_eq!(hash, "new-hash");
    }

    #[tokio::test]
    #[ignore = "needs a disposable Postgres via DATABASE_URL"]
    async fn test_expired_reset_token_is_rejected() {
        let pool = test_pool().await;
        let repo = UserRepository::new(&pool);

        let email = unique_email("edda");
        repo.create("Edda", &email, "old-hash", &PermissionSet::default_user())
            .await
            .unwrap();

        let token = unique_token();
        repo.set_reset_token(&email, &token, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        let consumed = repo.consume_reset_token(&token, "new-hash").await.unwrap();
        assert!(consumed.is_none());

        // Nothing was overwritten by the failed attempt.
        let (_, hash) = repo.get_auth_by_email(&email).await.unwrap().unwrap();
        assert_eq!(hash, "old-hash");
    }
}
