//! Domain entities as they cross the service and response boundaries.
//!
//! Credentials never appear here: password hashes and reset tokens live only
//! inside the repository layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use thimble_core::{CartLineId, Cents, Email, ItemId, OrderId, OrderLineId, PermissionSet, UserId};

/// An authenticated principal.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog item.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: ItemId,
    /// Set at creation, immutable thereafter.
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    /// Unit price in minor currency units.
    pub price: Cents,
    pub image: Option<String>,
    pub large_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One line of a user's pending cart, joined with its item.
///
/// `item` is `None` when the item was deleted after being added to the cart;
/// such lines render as removed and price nothing at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CartEntry {
    pub id: CartLineId,
    pub user_id: UserId,
    pub quantity: i32,
    pub item: Option<Item>,
}

/// A completed purchase.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// The captured amount, in minor units. Server-computed, never the
    /// client's figure.
    pub total: Cents,
    /// Opaque payment-gateway charge reference.
    pub charge: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

/// Immutable snapshot of one purchased item at checkout time.
///
/// Deliberately decoupled from the live catalog so historical orders survive
/// item edits and deletions.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub title: String,
    pub description: String,
    pub price: Cents,
    pub image: Option<String>,
    pub quantity: i32,
}

/// A not-yet-persisted [`OrderLine`], copied from a cart line and its item
/// during checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineSnapshot {
    pub title: String,
    pub description: String,
    pub price: Cents,
    pub image: Option<String>,
    pub quantity: i32,
}
