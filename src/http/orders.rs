//! Checkout and order history. Both need a signed-in customer.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use super::extract::RequireCustomer;
use super::AppState;
use crate::domain::aggregates::PaymentMethod;
use crate::services::{CheckoutRequest, ReceiptUpload, MAX_RECEIPT_BYTES};
use crate::store::Store;
use crate::{OrderingError, Result};

fn bad_form(e: MultipartError) -> OrderingError {
    OrderingError::InvalidInput(e.body_text())
}

fn too_large(size: u64) -> OrderingError {
    OrderingError::ReceiptTooLarge { size, max: MAX_RECEIPT_BYTES }
}

/// Buffers the receipt and stops as soon as it passes the size limit, so an
/// oversized file never reaches the request body limit.
async fn read_receipt(field: &mut Field<'_>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return Ok(bytes),
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => return Err(too_large(bytes.len() as u64)),
            Err(e) => return Err(bad_form(e)),
        };
        bytes.extend_from_slice(&chunk);
        if bytes.len() as u64 > MAX_RECEIPT_BYTES {
            return Err(too_large(bytes.len() as u64));
        }
    }
}

/// Reads the checkout form. An empty file input means no receipt.
async fn read_checkout_form(mut form: Multipart) -> Result<CheckoutRequest> {
    let mut request = CheckoutRequest::default();
    while let Some(mut field) = form.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "receipt_image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = read_receipt(&mut field).await?;
            if !file_name.is_empty() && !bytes.is_empty() {
                request.receipt = Some(ReceiptUpload { file_name, bytes });
            }
            continue;
        }
        let value = field.text().await.map_err(bad_form)?;
        match name.as_str() {
            "delivery_address" => request.delivery_address = value,
            "delivery_phone" => request.delivery_phone = value,
            "special_instructions" => request.special_instructions = value,
            "payment_reference" => request.payment_reference = value,
            "payment_method" if !value.trim().is_empty() => request.payment_method = value.parse::<PaymentMethod>()?,
            _ => {}
        }
    }
    Ok(request)
}

pub async fn checkout<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(customer_id): RequireCustomer,
    form: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    let request = read_checkout_form(form).await?;
    let outcome = state.checkout.checkout(customer_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Order placed successfully",
            "order_id": outcome.order_id,
            "invoice_no": outcome.invoice_no,
            "total_amount": outcome.total_amount,
            "payment_id": outcome.payment_id,
        })),
    ))
}

pub async fn list_orders<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(customer_id): RequireCustomer,
) -> Result<Json<Value>> {
    let orders = state.orders.past_orders(customer_id).await?;
    Ok(Json(json!({ "status": "success", "orders": orders })))
}

pub async fn order_details<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(customer_id): RequireCustomer,
    Path(order_id): Path<i64>,
) -> Result<Json<Value>> {
    let details = state.orders.order_details(customer_id, order_id).await?;
    Ok(Json(json!({
        "status": "success",
        "order": details.order,
        "lines": details.lines,
        "payment": details.payment,
    })))
}
