//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side failures to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! One variant deserves a note: [`AppError::DanglingCharge`] means the
//! payment gateway captured money but the order transaction failed
//! afterward. It is never presented as success, always alerts, and always
//! carries the charge id so the charge can be reconciled by hand.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use thimble_core::UserId;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::mail::MailError;
use crate::services::payment::PaymentError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// No identity where one is required.
    #[error("you must be signed in to do this")]
    Unauthorized,

    /// Identity present but lacking permission or ownership.
    #[error("you are not allowed to do this")]
    Forbidden,

    /// Referenced entity absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller input malformed.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Reset token unknown, consumed, or expired.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Payment gateway declined, errored, or timed out.
    #[error("payment failed: {0}")]
    Payment(#[from] PaymentError),

    /// Payment captured but the order could not be persisted. Fatal:
    /// requires manual reconciliation against the gateway.
    #[error("payment {charge_id} captured for user {user_id} but order persistence failed")]
    DanglingCharge {
        charge_id: String,
        user_id: UserId,
        #[source]
        source: RepositoryError,
    },

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Mail dispatch failed.
    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(e) => Self::Validation(e.to_string()),
            AuthError::WeakPassword(msg) => Self::Validation(msg),
            AuthError::PasswordMismatch => {
                Self::Validation("passwords do not match".to_owned())
            }
            AuthError::InvalidCredentials => {
                Self::Validation("invalid email or password".to_owned())
            }
            AuthError::UserNotFound(email) => Self::NotFound(format!("no user found for {email}")),
            AuthError::UserAlreadyExists => {
                Self::Validation("an account with this email already exists".to_owned())
            }
            AuthError::InvalidResetToken => Self::InvalidResetToken,
            AuthError::Repository(e) => Self::Database(e),
            AuthError::Mail(e) => Self::Mail(e),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
            AuthError::Session(e) => Self::Internal(format!("session signing failed: {e}")),
        }
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidResetToken => StatusCode::BAD_REQUEST,
            Self::Payment(_) => StatusCode::PAYMENT_REQUIRED,
            Self::DanglingCharge { .. } | Self::Database(_) | Self::Mail(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message shown to the client. Internal detail stays out of it.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) | Self::Mail(_) => {
                "internal server error".to_owned()
            }
            Self::DanglingCharge { .. } => {
                // Must never read as success: money moved, the order did not.
                "your payment was received but the order could not be recorded; \
                 support has been notified"
                    .to_owned()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Server-side failures go to Sentry; a dangling charge is the one
        // case that must page somebody.
        match &self {
            Self::DanglingCharge {
                charge_id,
                user_id,
                source,
            } => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(
                    charge_id = %charge_id,
                    user_id = %user_id,
                    error = %source,
                    sentry_event_id = %event_id,
                    "DANGLING CHARGE: payment captured without a persisted order, \
                     manual reconciliation required"
                );
            }
            Self::Database(_) | Self::Internal(_) | Self::Mail(_) => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(error = %self, sentry_event_id = %event_id, "Request error");
            }
            _ => {}
        }

        let status = self.status();
        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotFound("item 3".to_owned()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("bad".to_owned()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::InvalidResetToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Payment(PaymentError::Declined {
                message: "card declined".to_owned()
            })
            .status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::Internal("boom".to_owned()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = AppError::Internal("connection string leaked".to_owned());
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn test_dangling_charge_never_reads_as_success() {
        let err = AppError::DanglingCharge {
            charge_id: "ch_123".to_owned(),
            user_id: UserId::new(1),
            source: RepositoryError::NotFound,
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let msg = err.public_message();
        assert!(msg.contains("could not be recorded"));
        assert!(!msg.to_lowercase().contains("success"));
    }

    #[test]
    fn test_auth_error_mapping() {
        assert!(matches!(
            AppError::from(AuthError::PasswordMismatch),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(AuthError::InvalidResetToken),
            AppError::InvalidResetToken
        ));
        assert!(matches!(
            AppError::from(AuthError::InvalidCredentials),
            AppError::Validation(_)
        ));
    }
}
