//! Authentication route handlers.
//!
//! Each successful signup, signin, and password reset issues a fresh session
//! credential and sets it on the response; signout clears it. Handlers stay
//! thin: parse, call the service, shape the response.

use axum::{Json, extract::State};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::User;
use crate::services::auth::AuthService;
use crate::services::session::{clear_session_cookie, session_cookie};
use crate::state::AppState;

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Signin request body.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Reset-request body.
#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

/// Reset-completion body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub reset_token: String,
    pub password: String,
    pub confirm_password: String,
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignupRequest>,
) -> Result<(CookieJar, Json<User>)> {
    let auth = AuthService::new(state.pool(), state.sessions());
    let authenticated = auth.signup(&body.name, &body.email, &body.password).await?;

    let jar = jar.add(session_cookie(authenticated.token));
    Ok((jar, Json(authenticated.user)))
}

/// POST /auth/signin
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SigninRequest>,
) -> Result<(CookieJar, Json<User>)> {
    let auth = AuthService::new(state.pool(), state.sessions());
    let authenticated = auth.signin(&body.email, &body.password).await?;

    let jar = jar.add(session_cookie(authenticated.token));
    Ok((jar, Json(authenticated.user)))
}

/// POST /auth/signout
pub async fn signout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.add(clear_session_cookie());
    (jar, Json(json!({ "message": "goodbye" })))
}

/// POST /auth/request-reset
pub async fn request_reset(
    State(state): State<AppState>,
    Json(body): Json<RequestResetRequest>,
) -> Result<Json<Value>> {
    let auth = AuthService::new(state.pool(), state.sessions());
    auth.request_reset(&body.email, state.mailer(), &state.config().frontend_url)
        .await?;

    Ok(Json(json!({ "message": "reset link sent" })))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<(CookieJar, Json<User>)> {
    let auth = AuthService::new(state.pool(), state.sessions());
    let authenticated = auth
        .reset_password(&body.reset_token, &body.password, &body.confirm_password)
        .await?;

    let jar = jar.add(session_cookie(authenticated.token));
    Ok((jar, Json(authenticated.user)))
}
