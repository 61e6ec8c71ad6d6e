//! Checkout pipeline: cart snapshot, server-side pricing, payment capture,
//! order materialization.
//!
//! The order of operations is load, price, charge, persist. Pricing happens
//! entirely here from the stored item prices; the client's idea of the total
//! is never consulted. The charge precedes the transaction that writes the
//! order, so a failure after capture is surfaced as a dangling charge rather
//! than rolled into a generic database error.

use sha2::{Digest, Sha256};
use sqlx::PgPool;

use thimble_core::{CartLineId, Cents, ItemId, UserId};

use crate::db::RepositoryError;
use crate::db::cart::CartRepository;
use crate::db::orders::OrderRepository;
use crate::error::AppError;
use crate::models::{CartEntry, Order, OrderLineSnapshot, User};
use crate::services::guard::require_user;
use crate::services::payment::{ChargeRequest, PaymentGateway};

/// A priced, immutable snapshot of the cart at the moment checkout began.
///
/// Everything downstream (the charge amount, the order lines, which cart
/// lines get cleared) comes from this value, so lines added to the cart
/// concurrently are invisible to the running checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    /// Total to capture, in minor units.
    pub amount: Cents,
    /// Line snapshots to persist with the order.
    pub lines: Vec<OrderLineSnapshot>,
    /// Exact cart line ids the snapshot covers; only these are cleared.
    pub cart_line_ids: Vec<CartLineId>,
    /// Deterministic key for this snapshot, sent to the gateway so a retried
    /// checkout reuses the original charge.
    pub idempotency_key: String,
}

impl OrderDraft {
    /// Price a cart snapshot.
    ///
    /// Lines whose item has been deleted carry no price and no snapshot;
    /// they are left in the cart untouched. An empty (or fully orphaned)
    /// cart prices to zero and still proceeds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the total overflows.
    pub fn from_cart(user_id: UserId, cart: &[CartEntry]) -> Result<Self, AppError> {
        let mut amount = Cents::ZERO;
        let mut lines = Vec::new();
        let mut cart_line_ids = Vec::new();
        let mut key_material = Vec::new();

        for entry in cart {
            let Some(item) = &entry.item else {
                continue;
            };

            let line_total = item
                .price
                .line_total(i64::from(entry.quantity))
                .ok_or_else(overflow_error)?;
            amount = amount.checked_add(line_total).ok_or_else(overflow_error)?;

            lines.push(OrderLineSnapshot {
                title: item.title.clone(),
                description: item.description.clone(),
                price: item.price,
                image: item.image.clone(),
                quantity: entry.quantity,
            });
            cart_line_ids.push(entry.id);
            key_material.push((entry.id, item.id, entry.quantity, item.price));
        }

        let idempotency_key = idempotency_key(user_id, &key_material);

        Ok(Self {
            amount,
            lines,
            cart_line_ids,
            idempotency_key,
        })
    }

    /// The charge to submit for this draft.
    #[must_use]
    pub fn charge_request(&self, currency: &str, source_token: &str) -> ChargeRequest {
        ChargeRequest {
            amount: self.amount,
            currency: currency.to_owned(),
            source_token: source_token.to_owned(),
            idempotency_key: self.idempotency_key.clone(),
        }
    }
}

fn overflow_error() -> AppError {
    AppError::Validation("cart total exceeds the representable amount".to_owned())
}

/// SHA-256 over the user id and the sorted line tuples. Insensitive to the
/// order lines were read in, sensitive to any quantity or price change.
fn idempotency_key(user_id: UserId, lines: &[(CartLineId, ItemId, i32, Cents)]) -> String {
    let mut sorted: Vec<_> = lines.to_vec();
    sorted.sort_by_key(|(line_id, ..)| *line_id);

    let mut hasher = Sha256::new();
    hasher.update(user_id.as_i64().to_be_bytes());
    for (line_id, item_id, quantity, price) in sorted {
        hasher.update(line_id.as_i64().to_be_bytes());
        hasher.update(item_id.as_i64().to_be_bytes());
        hasher.update(quantity.to_be_bytes());
        hasher.update(price.as_i64().to_be_bytes());
    }

    let digest = hasher.finalize();
    digest.iter().fold(String::with_capacity(64), |mut out, b| {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Order persistence as the checkout pipeline sees it.
///
/// Mirrors [`PaymentGateway`]: the concrete implementation is the
/// transactional [`OrderRepository`], and the pipeline stays generic so the
/// charge-ordering guarantees are exercised against in-memory doubles.
pub trait OrderStore {
    /// Persist the order with its line snapshots and clear the charged cart
    /// lines atomically.
    fn create_with_lines(
        &self,
        user_id: UserId,
        total: Cents,
        charge: &str,
        lines: &[OrderLineSnapshot],
        charged_cart_line_ids: &[CartLineId],
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;
}

impl OrderStore for OrderRepository<'_> {
    async fn create_with_lines(
        &self,
        user_id: UserId,
        total: Cents,
        charge: &str,
        lines: &[OrderLineSnapshot],
        charged_cart_line_ids: &[CartLineId],
    ) -> Result<Order, RepositoryError> {
        OrderRepository::create_with_lines(
            self,
            user_id,
            total,
            charge,
            lines,
            charged_cart_line_ids,
        )
        .await
    }
}

/// Checkout service, generic over the payment gateway.
pub struct CheckoutService<'a, G> {
    cart: CartRepository<'a>,
    orders: OrderRepository<'a>,
    gateway: &'a G,
    currency: &'a str,
}

impl<'a, G: PaymentGateway> CheckoutService<'a, G> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, gateway: &'a G, currency: &'a str) -> Self {
        Self {
            cart: CartRepository::new(pool),
            orders: OrderRepository::new(pool),
            gateway,
            currency,
        }
    }

    /// Run the full pipeline: snapshot the cart, price it, capture the
    /// charge, materialize the order, clear the charged cart lines.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` without an identity,
    /// `AppError::Payment` if the gateway declines or times out (nothing
    /// persisted, cart untouched), and `AppError::DanglingCharge` if the
    /// charge succeeded but the order transaction failed.
    pub async fn checkout(
        &self,
        caller: Option<&User>,
        payment_token: &str,
    ) -> Result<Order, AppError> {
        let caller = require_user(caller)?;

        let cart = self.cart.load_cart(caller.id).await?;
        settle(
            caller.id,
            &cart,
            payment_token,
            self.gateway,
            &self.orders,
            self.currency,
        )
        .await
    }
}

/// The pipeline after the cart read: price, charge, persist.
///
/// A declined or timed-out charge returns before the store is touched, so
/// nothing is persisted and the cart is left as it was. A store failure
/// after capture maps to `AppError::DanglingCharge` carrying the gateway's
/// charge id.
async fn settle<G: PaymentGateway, S: OrderStore>(
    user_id: UserId,
    cart: &[CartEntry],
    payment_token: &str,
    gateway: &G,
    orders: &S,
    currency: &str,
) -> Result<Order, AppError> {
    let draft = OrderDraft::from_cart(user_id, cart)?;

    tracing::info!(
        user_id = %user_id,
        amount = %draft.amount,
        line_count = draft.lines.len(),
        "Submitting charge"
    );

    let charge = gateway
        .charge(&draft.charge_request(currency, payment_token))
        .await?;

    if charge.amount != draft.amount {
        tracing::warn!(
            charge_id = %charge.id,
            requested = %draft.amount,
            captured = %charge.amount,
            "Gateway captured a different amount than requested"
        );
    }

    // The order records what the gateway confirms it captured.
    let order = orders
        .create_with_lines(
            user_id,
            charge.amount,
            &charge.id,
            &draft.lines,
            &draft.cart_line_ids,
        )
        .await
        .map_err(|source| AppError::DanglingCharge {
            charge_id: charge.id.clone(),
            user_id,
            source,
        })?;

    tracing::info!(
        order_id = %order.id,
        charge_id = %order.charge,
        total = %order.total,
        "Order placed"
    );
    Ok(order)
}
