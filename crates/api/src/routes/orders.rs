//! Order and checkout route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use thimble_core::OrderId;

use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, RequireAuth};
use crate::models::Order;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// Checkout request body. The token is the single-use payment source minted
/// client-side; the amount is never part of the payload.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub token: String,
}

/// POST /orders
pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<Order>> {
    let service = CheckoutService::new(
        state.pool(),
        state.gateway(),
        &state.config().stripe.currency,
    );

    let order = service.checkout(user.as_ref(), &body.token).await?;
    Ok(Json(order))
}

/// GET /orders
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list_for_user(user.id).await?;
    Ok(Json(orders))
}

/// GET /orders/{id}
///
/// Scoped by owner: another user's order id is indistinguishable from a
/// missing one.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no order with id {id}")))?;

    Ok(Json(order))
}
