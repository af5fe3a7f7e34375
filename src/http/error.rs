//! Maps service errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;
use crate::OrderingError;

impl OrderingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::MissingDeliveryInfo | Self::InvalidReceiptType(_) => StatusCode::BAD_REQUEST,
            Self::EmptyCart => StatusCode::CONFLICT,
            Self::ProductNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ReceiptTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::PersistenceFailure(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::PersistenceFailure(_) | Self::ReceiptStorageFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client is told. Storage details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::PersistenceFailure(StoreError::Conflict(_)) => "Your order could not be placed. Please try again".into(),
            Self::PersistenceFailure(_) | Self::ReceiptStorageFailed(_) => "Something went wrong. Please try again later".into(),
            Self::EmptyCart => "Your cart is empty".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for OrderingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "status": "error", "message": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_details_are_hidden() {
        let err = OrderingError::PersistenceFailure(StoreError::Unavailable("pg at 10.2.3.4 refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("10.2.3.4"));
    }

    #[test]
    fn test_invoice_collision_is_retryable() {
        let err = OrderingError::PersistenceFailure(StoreError::Conflict("invoice number INV-20240101-0001".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
