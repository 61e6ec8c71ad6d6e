//! Cart route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;

use thimble_core::{CartLineId, ItemId};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::CartEntry;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub item_id: ItemId,
}

/// Remove-from-cart request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub cart_line_id: CartLineId,
}

/// GET /cart
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CartEntry>>> {
    let cart = CartService::new(state.pool()).load_cart(user.as_ref()).await?;
    Ok(Json(cart))
}

/// POST /cart/add
pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartEntry>> {
    let entry = CartService::new(state.pool())
        .add_to_cart(user.as_ref(), body.item_id)
        .await?;
    Ok(Json(entry))
}

/// POST /cart/remove
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<RemoveFromCartRequest>,
) -> Result<Json<CartEntry>> {
    let entry = CartService::new(state.pool())
        .remove_from_cart(user.as_ref(), body.cart_line_id)
        .await?;
    Ok(Json(entry))
}
