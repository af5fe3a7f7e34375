//! JSON and multipart API over the services.
//!
//! Every response carries `status` (`success` or `error`) and, for writes, a
//! human-readable `message`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use validator::Validate;

use crate::services::{CartService, CheckoutService, EventPublisher, OrderService, ReceiptStorage, MAX_RECEIPT_BYTES};
use crate::store::Store;
use crate::{OrderingError, Result};

pub mod cart;
mod error;
pub mod extract;
pub mod orders;

/// Room for a full-size receipt plus the text fields of the form.
const CHECKOUT_BODY_LIMIT: usize = MAX_RECEIPT_BYTES as usize + 1024 * 1024;

#[derive(Clone)]
pub struct AppState<S> {
    pub cart: CartService<S>,
    pub checkout: CheckoutService<S>,
    pub orders: OrderService<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, receipts: ReceiptStorage, events: EventPublisher) -> Self {
        Self {
            cart: CartService::new(store.clone()),
            checkout: CheckoutService::new(store.clone(), receipts, events),
            orders: OrderService::new(store),
        }
    }
}

pub(crate) fn validated<T: Validate>(body: T) -> Result<T> {
    body.validate().map_err(|e| OrderingError::InvalidInput(e.to_string()))?;
    Ok(body)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": env!("CARGO_PKG_NAME") }))
}

pub fn router<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/cart", get(cart::view_cart::<S>).delete(cart::empty_cart::<S>))
        .route("/api/v1/cart/count", get(cart::cart_count::<S>))
        .route("/api/v1/cart/items", post(cart::add_item::<S>))
        .route("/api/v1/cart/items/:product_id", put(cart::update_item::<S>).delete(cart::remove_item::<S>))
        .route(
            "/api/v1/checkout",
            post(orders::checkout::<S>).layer(DefaultBodyLimit::max(CHECKOUT_BODY_LIMIT)),
        )
        .route("/api/v1/orders", get(orders::list_orders::<S>))
        .route("/api/v1/orders/:id", get(orders::order_details::<S>))
        .with_state(state)
}
