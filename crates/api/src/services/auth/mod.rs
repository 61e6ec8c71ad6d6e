//! Authentication service.
//!
//! Registration, sign-in, and the password-reset flow. Passwords are hashed
//! with Argon2id; reset tokens are single-use random secrets that expire an
//! hour after issue and are consumed atomically in the repository.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use sqlx::PgPool;

use thimble_core::{Email, PermissionSet};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;
use crate::services::mail::Mailer;
use crate::services::session::SessionCodec;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Reset tokens die an hour after issue.
const RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Random bytes behind a reset token; rendered as hex.
const RESET_TOKEN_BYTES: usize = 20;

/// A signed-in user together with their freshly issued session credential.
#[derive(Debug)]
pub struct Authenticated {
    pub user: User,
    pub token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    sessions: &'a SessionCodec,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, sessions: &'a SessionCodec) -> Self {
        Self {
            users: UserRepository::new(pool),
            sessions,
        }
    }

    /// Register a new account and sign it in.
    ///
    /// The permission set always starts as the default for self-service
    /// registration; callers cannot smuggle in grants.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email doesn't parse,
    /// `AuthError::WeakPassword` if the password fails validation, and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Authenticated, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &password_hash, &PermissionSet::default_user())
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let token = self.sessions.sign(user.id)?;
        tracing::info!(user_id = %user.id, "New account registered");

        Ok(Authenticated { user, token })
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account matches the email and
    /// `AuthError::InvalidCredentials` if the password is wrong.
    pub async fn signin(&self, email: &str, password: &str) -> Result<Authenticated, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_auth_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(email.to_string()))?;

        verify_password(password, &password_hash)?;

        let token = self.sessions.sign(user.id)?;
        Ok(Authenticated { user, token })
    }

    /// Begin a password reset: mint a token, store it with its expiry, and
    /// mail the reset link.
    ///
    /// Requires no session; possession of the mailbox is the proof.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account matches the email and
    /// `AuthError::Mail` if the message cannot be dispatched.
    pub async fn request_reset(
        &self,
        email: &str,
        mailer: &Mailer,
        frontend_url: &str,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::seconds(RESET_TOKEN_TTL_SECS);

        let user = self
            .users
            .set_reset_token(&email, &token, expires_at)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound(email.to_string()),
                other => AuthError::Repository(other),
            })?;

        let reset_url = format!(
            "{}/reset?resetToken={token}",
            frontend_url.trim_end_matches('/')
        );
        mailer.send_password_reset(&user.email, &reset_url).await?;

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Complete a password reset and sign the account in.
    ///
    /// The token is compared and cleared in one statement, so of two
    /// concurrent submissions exactly one wins; the loser sees an invalid
    /// token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs,
    /// `AuthError::WeakPassword` if the new password fails validation, and
    /// `AuthError::InvalidResetToken` if the token is unknown, consumed, or
    /// expired.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Authenticated, AuthError> {
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .consume_reset_token(token, &password_hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let token = self.sessions.sign(user.id)?;
        tracing::info!(user_id = %user.id, "Password reset completed");

        Ok(Authenticated { user, token })
    }
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Mint a reset token: random bytes rendered as lowercase hex.
fn generate_reset_token() -> String {
    use std::fmt::Write;

    use rand::RngCore;

    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    bytes.iter().fold(
        String::with_capacity(RESET_TOKEN_BYTES * 2),
        |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_too_short() {
        assert!(matches!(
            validate_password("short").unwrap_err(),
            AuthError::WeakPassword(_)
        ));
    }

    #[test]
    fn test_validate_password_ok() {
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(matches!(
            verify_password("incorrect horse", &hash).unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn test_malformed_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string").unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn test_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_reset_tokens_differ() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }
}
