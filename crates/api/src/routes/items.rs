//! Catalog item route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use thimble_core::{Cents, ItemId};

use crate::db::items::ItemChanges;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::Item;
use crate::services::catalog::{CatalogService, NewItem};
use crate::state::AppState;

/// Create-item request body. Price arrives as integer minor units.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub image: Option<String>,
    pub large_image: Option<String>,
}

/// Update-item request body. Absent fields are left untouched. There is no
/// id field; the target comes from the path alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub image: Option<String>,
    pub large_image: Option<String>,
}

fn parse_price(minor_units: i64) -> Result<Cents> {
    if minor_units < 0 {
        return Err(AppError::Validation("price cannot be negative".to_owned()));
    }
    Ok(Cents::new(minor_units))
}

/// POST /items
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateItemRequest>,
) -> Result<Json<Item>> {
    let new = NewItem {
        title: body.title,
        description: body.description,
        price: parse_price(body.price)?,
        image: body.image,
        large_image: body.large_image,
    };

    let item = CatalogService::new(state.pool())
        .create_item(user.as_ref(), new)
        .await?;
    Ok(Json(item))
}

/// PATCH /items/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<Item>> {
    let changes = ItemChanges {
        title: body.title,
        description: body.description,
        price: body.price.map(parse_price).transpose()?,
        image: body.image,
        large_image: body.large_image,
    };

    let item = CatalogService::new(state.pool()).update_item(id, changes).await?;
    Ok(Json(item))
}

/// DELETE /items/{id}
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<ItemId>,
) -> Result<Json<Item>> {
    let item = CatalogService::new(state.pool())
        .delete_item(user.as_ref(), id)
        .await?;
    Ok(Json(item))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_rejects_negative() {
        assert!(parse_price(-1).is_err());
    }

    #[test]
    fn test_parse_price_accepts_zero_and_positive() {
        assert_eq!(parse_price(0).ok(), Some(Cents::ZERO));
        assert_eq!(parse_price(2200).ok(), Some(Cents::new(2200)));
    }

    #[test]
    fn test_update_request_drops_stray_id_field() {
        // A payload smuggling an id must not be able to re-point the target;
        // the struct simply has nowhere to put it.
        let body: UpdateItemRequest =
            serde_json::from_str(r#"{"id": 99, "title": "renamed"}"#).unwrap();
        assert_eq!(body.title.as_deref(), Some("renamed"));
    }
}
