//! Food-ordering cart and checkout
//!
//! Customers collect dishes in a persistent cart and turn it into an order
//! with a self-reported payment record.
//!
//! ## Features
//! - Carts scoped to a customer or, for guests, to a network address
//! - Checkout as one all-or-nothing transaction, priced from the live catalog
//! - Receipt uploads for mobile money and bank transfer payments
//! - Order history with lines and payment
//! - PostgreSQL or in-memory storage

use thiserror::Error;

pub mod config;
pub mod domain;
pub mod http;
pub mod services;
pub mod store;

pub use domain::aggregates::{CartItem, Identity, Order, OrderSummary, Payment, PaymentMethod, Product};
pub use domain::value_objects::{CustomerId, InvoiceNumber, Money, OrderId, PaymentId, ProductId, Quantity};
pub use services::{CartService, CheckoutOutcome, CheckoutRequest, CheckoutService, OrderService};
pub use store::{Store, StoreError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum OrderingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Delivery address and phone are required")]
    MissingDeliveryInfo,

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Invalid receipt file type '{0}'. Only JPG, PNG, and GIF files are allowed")]
    InvalidReceiptType(String),

    #[error("Receipt is too large ({size} bytes read). Maximum size is {max} bytes")]
    ReceiptTooLarge { size: u64, max: u64 },

    #[error("Failed to store receipt: {0}")]
    ReceiptStorageFailed(#[source] std::io::Error),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    #[error("Please log in to continue")]
    NotAuthenticated,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<domain::value_objects::ValueError> for OrderingError {
    fn from(e: domain::value_objects::ValueError) -> Self { Self::InvalidInput(e.to_string()) }
}

impl From<domain::aggregates::UnknownVariant> for OrderingError {
    fn from(e: domain::aggregates::UnknownVariant) -> Self { Self::InvalidInput(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, OrderingError>;
