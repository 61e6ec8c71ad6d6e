//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::mail::MailError;
use crate::services::session::SessionError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] thimble_core::EmailError),

    /// Wrong password for an existing account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account behind the given email.
    #[error("no user found for email {0}")]
    UserNotFound(String),

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// New password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Reset token unknown, already consumed, or expired.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Reset mail could not be dispatched.
    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Session credential could not be signed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
