//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (pings the database)
//!
//! # Auth
//! POST /auth/signup                - Register and sign in
//! POST /auth/signin                - Sign in
//! POST /auth/signout               - Sign out (clears the session cookie)
//! POST /auth/request-reset         - Mail a password-reset link
//! POST /auth/reset-password        - Consume a reset token, set a password
//!
//! # Users
//! GET  /me                         - The caller, or null
//! GET  /users                      - All users (admin-gated)
//! POST /users/{id}/permissions     - Replace a user's permission set
//!
//! # Items
//! POST   /items                    - Create an item (owned by the caller)
//! PATCH  /items/{id}               - Update an item's fields
//! DELETE /items/{id}               - Delete an item (owner or override)
//!
//! # Cart
//! GET  /cart                       - The caller's cart
//! POST /cart/add                   - Add one unit of an item
//! POST /cart/remove                - Remove a cart line
//!
//! # Orders
//! POST /orders                     - Checkout: charge the cart, place an order
//! GET  /orders                     - The caller's orders, newest first
//! GET  /orders/{id}                - One of the caller's orders
//! ```

pub mod auth;
pub mod cart;
pub mod items;
pub mod orders;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/signout", post(auth::signout))
        .route("/request-reset", post(auth::request_reset))
        .route("/reset-password", post(auth::reset_password))
}

/// Create the item routes router.
pub fn item_routes() -> Router<AppState> {
    Router::new().route("/", post(items::create)).route(
        "/{id}",
        axum::routing::patch(items::update).delete(items::delete),
    )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::checkout).get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create the full application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/me", get(users::me))
        .route("/users", get(users::index))
        .route("/users/{id}/permissions", post(users::update_permissions))
        .nest("/auth", auth_routes())
        .nest("/items", item_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
}

/// Liveness check. Does not touch dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check. Verifies database connectivity; 503 when unreachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
