//! User query and administration route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use thimble_core::{PermissionSet, UserId};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::User;
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Permission-replacement request body. Unknown permission tokens and empty
/// sets fail deserialization at the boundary.
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: PermissionSet,
}

/// GET /me
///
/// The caller's own record, or `null` with no session. Never an error; the
/// frontend polls this to decide what to render.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<Option<User>> {
    Json(user)
}

/// GET /users
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<User>>> {
    let users = CatalogService::new(state.pool()).list_users(user.as_ref()).await?;
    Ok(Json(users))
}

/// POST /users/{id}/permissions
pub async fn update_permissions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<UserId>,
    Json(body): Json<UpdatePermissionsRequest>,
) -> Result<Json<User>> {
    let updated = CatalogService::new(state.pool())
        .update_permissions(user.as_ref(), id, body.permissions)
        .await?;
    Ok(Json(updated))
}
