//! Persistence seam for carts, the catalog and orders.
//!
//! Two backends implement these traits: [`postgres::PgStore`] for the real
//! service and [`memory::MemoryStore`] for tests and database-less runs.
//! Everything the checkout writes goes through a [`CheckoutTx`], so either
//! the order, its lines and its payment all land, or none of them do.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::{
    CartItem, CartLine, Identity, NewOrder, NewPayment, Order, OrderLine, OrderLineDetail, OrderSummary, Payment,
    Product,
};
use crate::domain::value_objects::{CustomerId, Money, OrderId, PaymentId, ProductId, Quantity};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint rejected the write, e.g. a duplicate invoice number.
    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative product lookup. Never cached.
#[async_trait]
pub trait Catalog: Send {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;
}

/// Cart rows, always scoped to one identity.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Inserts the line, or adds `quantity` to the existing line for the product.
    async fn add_item(&self, identity: &Identity, product_id: ProductId, quantity: Quantity) -> Result<(), StoreError>;
    /// Returns `false` when the identity holds no line for the product.
    async fn update_item(&self, identity: &Identity, product_id: ProductId, quantity: Quantity) -> Result<bool, StoreError>;
    async fn remove_item(&self, identity: &Identity, product_id: ProductId) -> Result<bool, StoreError>;
    /// Lines joined with live product details, by product id ascending.
    async fn list_items(&self, identity: &Identity) -> Result<Vec<CartItem>, StoreError>;
    async fn clear(&self, identity: &Identity) -> Result<u64, StoreError>;
    async fn item_count(&self, identity: &Identity) -> Result<i64, StoreError>;
    /// Sum of quantity times the current catalog price.
    async fn total(&self, identity: &Identity) -> Result<Money, StoreError>;
}

/// Read side of placed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Newest first.
    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderSummary>, StoreError>;
    async fn order(&self, customer_id: CustomerId, order_id: OrderId) -> Result<Option<Order>, StoreError>;
    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineDetail>, StoreError>;
    /// Most recent payment recorded against the order.
    async fn payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, StoreError>;
}

#[async_trait]
pub trait Store: Catalog + CartStore + OrderStore + Clone + 'static {
    type Tx: CheckoutTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// One checkout's unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait CheckoutTx: Catalog {
    async fn cart_lines(&mut self, customer_id: CustomerId) -> Result<Vec<CartLine>, StoreError>;
    /// Writes the order with status `pending` and returns it with its assigned id.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError>;
    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<(), StoreError>;
    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<PaymentId, StoreError>;
    async fn commit(self) -> Result<(), StoreError>;
    async fn rollback(self) -> Result<(), StoreError>;
}
