//! Cart endpoints. Anyone may keep a cart; guests are scoped by address.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use super::extract::Caller;
use super::{validated, AppState};
use crate::store::Store;
use crate::Result;

fn one() -> i64 { 1 }

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    #[validate(range(min = 1))]
    pub product_id: i64,
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 2147483647))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(max = 2147483647))]
    pub quantity: i64,
}

pub async fn view_cart<S: Store>(State(state): State<AppState<S>>, Caller(identity): Caller) -> Result<Json<Value>> {
    let items = state.cart.list_cart(&identity).await?;
    let count = state.cart.cart_item_count(&identity).await?;
    let total = state.cart.cart_total(&identity).await?;
    Ok(Json(json!({ "status": "success", "items": items, "count": count, "total": total })))
}

pub async fn cart_count<S: Store>(State(state): State<AppState<S>>, Caller(identity): Caller) -> Result<Json<Value>> {
    let count = state.cart.cart_item_count(&identity).await?;
    Ok(Json(json!({ "status": "success", "count": count })))
}

pub async fn add_item<S: Store>(
    State(state): State<AppState<S>>,
    Caller(identity): Caller,
    Json(body): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let body = validated(body)?;
    state.cart.add_to_cart(&identity, body.product_id, body.quantity).await?;
    let count = state.cart.cart_item_count(&identity).await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "success", "message": "Item added to cart", "count": count }))))
}

/// A quantity of zero or less removes the line.
pub async fn update_item<S: Store>(
    State(state): State<AppState<S>>,
    Caller(identity): Caller,
    Path(product_id): Path<i64>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<Value>> {
    let body = validated(body)?;
    let message = if body.quantity <= 0 {
        state.cart.remove_from_cart(&identity, product_id).await?;
        "Item removed from cart"
    } else {
        state.cart.update_cart_item(&identity, product_id, body.quantity).await?;
        "Cart updated"
    };
    let count = state.cart.cart_item_count(&identity).await?;
    Ok(Json(json!({ "status": "success", "message": message, "count": count })))
}

pub async fn remove_item<S: Store>(
    State(state): State<AppState<S>>,
    Caller(identity): Caller,
    Path(product_id): Path<i64>,
) -> Result<Json<Value>> {
    state.cart.remove_from_cart(&identity, product_id).await?;
    let count = state.cart.cart_item_count(&identity).await?;
    Ok(Json(json!({ "status": "success", "message": "Item removed from cart", "count": count })))
}

pub async fn empty_cart<S: Store>(State(state): State<AppState<S>>, Caller(identity): Caller) -> Result<Json<Value>> {
    state.cart.empty_cart(&identity).await?;
    Ok(Json(json!({ "status": "success", "message": "Cart emptied", "count": 0 })))
}
