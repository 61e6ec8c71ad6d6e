//! Identity extractors.
//!
//! Every request may carry a session cookie. The extractors here turn it
//! into a freshly loaded [`User`]: the credential only asserts a user id,
//! and the user row behind it is re-read on every request, so deletions and
//! permission changes take effect immediately.
//!
//! An absent, malformed, or expired credential is not an error. It resolves
//! to no identity, and the guard layer decides whether that matters.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::models::User;
use crate::services::SESSION_COOKIE;
use crate::state::AppState;

/// The request's identity, if any.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     match user {
///         Some(user) => format!("hello, {}", user.name),
///         None => "hello, stranger".to_owned(),
///     }
/// }
/// ```
pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };

        let Some(user_id) = state.sessions().verify(cookie.value()) else {
            return Ok(Self(None));
        };

        // A valid credential for a deleted user is also no identity.
        let user = UserRepository::new(state.pool()).get_by_id(user_id).await?;
        Ok(Self(user))
    }
}

/// An identity, required.
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        user.map(Self).ok_or(AppError::Unauthorized)
    }
}
