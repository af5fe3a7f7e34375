//! PostgreSQL store.
//!
//! Tables live in `migrations/`. Cart queries take the identity as the first
//! two parameters (`$1` customer id, `$2` network address) so that one
//! statement serves both scopes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;

use super::{CartStore, Catalog, CheckoutTx, OrderStore, Store, StoreError};
use crate::domain::aggregates::{
    CartItem, CartLine, DeliveryDetails, Identity, NewOrder, NewPayment, Order, OrderLine, OrderLineDetail,
    OrderStatus, OrderSummary, Payment, Product,
};
use crate::domain::value_objects::{
    CustomerId, InvoiceNumber, Money, OrderId, PaymentId, ProductId, Quantity,
};

/// Matches the rows of one identity. Guest rows never carry a customer id.
macro_rules! identity_scope {
    () => {
        "(($1::BIGINT IS NOT NULL AND cart.customer_id = $1) \
         OR ($1::BIGINT IS NULL AND cart.ip_add = $2 AND COALESCE(cart.customer_id, 0) = 0))"
    };
}

const PRODUCT_BY_ID: &str = "SELECT id, title, price, image, description FROM products WHERE id = $1";

const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.invoice_no, o.status, o.total_amount, o.delivery_address, \
     o.delivery_phone, o.special_instructions, o.created_at";

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

fn scope(identity: &Identity) -> (Option<CustomerId>, Option<&str>) {
    match identity {
        Identity::Customer(id) => (Some(*id), None),
        Identity::Anonymous(address) => (None, Some(address.as_str())),
    }
}

fn write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(db.message().to_string()),
        _ => StoreError::Database(err),
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    invoice_no: InvoiceNumber,
    status: String,
    total_amount: Decimal,
    delivery_address: String,
    delivery_phone: String,
    special_instructions: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, StoreError> {
        Ok(Order {
            id: row.id,
            customer_id: row.customer_id,
            invoice_no: row.invoice_no,
            status: row.status.parse::<OrderStatus>().map_err(|e| StoreError::Corrupt(e.to_string()))?,
            total: Money::new(row.total_amount),
            delivery: DeliveryDetails {
                address: row.delivery_address,
                phone: row.delivery_phone,
                special_instructions: row.special_instructions,
            },
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderSummaryRow {
    #[sqlx(flatten)]
    order: OrderRow,
    item_count: i64,
    total_items: i64,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    product_id: ProductId,
    quantity: Quantity,
    title: String,
    price: Decimal,
    image: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: PaymentId,
    customer_id: CustomerId,
    order_id: OrderId,
    amount: Decimal,
    method: String,
    status: String,
    reference: Option<String>,
    receipt_image: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, StoreError> {
        let corrupt = |e: crate::domain::aggregates::UnknownVariant| StoreError::Corrupt(e.to_string());
        Ok(Payment {
            id: row.id,
            customer_id: row.customer_id,
            order_id: row.order_id,
            amount: Money::new(row.amount),
            method: row.method.parse().map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            reference: row.reference,
            receipt_image: row.receipt_image,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl Catalog for PgStore {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(sqlx::query_as::<_, Product>(PRODUCT_BY_ID).bind(id).fetch_optional(&self.pool).await?)
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn add_item(&self, identity: &Identity, product_id: ProductId, quantity: Quantity) -> Result<(), StoreError> {
        let sql = match identity {
            Identity::Customer(_) => {
                "INSERT INTO cart (product_id, customer_id, ip_add, quantity) VALUES ($1, $2, '', $3) \
                 ON CONFLICT (customer_id, product_id) WHERE customer_id > 0 \
                 DO UPDATE SET quantity = LEAST(cart.quantity::BIGINT + EXCLUDED.quantity, 2147483647)::INT"
            }
            Identity::Anonymous(_) => {
                "INSERT INTO cart (product_id, customer_id, ip_add, quantity) VALUES ($1, NULL, $2, $3) \
                 ON CONFLICT (ip_add, product_id) WHERE COALESCE(customer_id, 0) = 0 \
                 DO UPDATE SET quantity = LEAST(cart.quantity::BIGINT + EXCLUDED.quantity, 2147483647)::INT"
            }
        };
        let query = sqlx::query(sql).bind(product_id);
        let query = match identity {
            Identity::Customer(id) => query.bind(*id),
            Identity::Anonymous(address) => query.bind(address.as_str()),
        };
        query.bind(quantity).execute(&self.pool).await.map_err(write_error)?;
        Ok(())
    }

    async fn update_item(&self, identity: &Identity, product_id: ProductId, quantity: Quantity) -> Result<bool, StoreError> {
        let (customer, address) = scope(identity);
        let result = sqlx::query(concat!("UPDATE cart SET quantity = $3 WHERE cart.product_id = $4 AND ", identity_scope!()))
            .bind(customer)
            .bind(address)
            .bind(quantity)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_item(&self, identity: &Identity, product_id: ProductId) -> Result<bool, StoreError> {
        let (customer, address) = scope(identity);
        let result = sqlx::query(concat!("DELETE FROM cart WHERE cart.product_id = $3 AND ", identity_scope!()))
            .bind(customer)
            .bind(address)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_items(&self, identity: &Identity) -> Result<Vec<CartItem>, StoreError> {
        let (customer, address) = scope(identity);
        let items = sqlx::query_as::<_, CartItem>(concat!(
            "SELECT p.id, p.title, p.price, p.image, p.description, cart.quantity \
             FROM cart INNER JOIN products p ON p.id = cart.product_id WHERE ",
            identity_scope!(),
            " ORDER BY cart.product_id"
        ))
        .bind(customer)
        .bind(address)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn clear(&self, identity: &Identity) -> Result<u64, StoreError> {
        let (customer, address) = scope(identity);
        let result = sqlx::query(concat!("DELETE FROM cart WHERE ", identity_scope!()))
            .bind(customer)
            .bind(address)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn item_count(&self, identity: &Identity) -> Result<i64, StoreError> {
        let (customer, address) = scope(identity);
        let count = sqlx::query_scalar::<_, i64>(concat!(
            "SELECT COALESCE(SUM(cart.quantity), 0)::BIGINT FROM cart WHERE ",
            identity_scope!()
        ))
        .bind(customer)
        .bind(address)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn total(&self, identity: &Identity) -> Result<Money, StoreError> {
        let (customer, address) = scope(identity);
        let total = sqlx::query_scalar::<_, Decimal>(concat!(
            "SELECT COALESCE(SUM(cart.quantity * p.price), 0)::NUMERIC(14, 2) \
             FROM cart INNER JOIN products p ON p.id = cart.product_id WHERE ",
            identity_scope!()
        ))
        .bind(customer)
        .bind(address)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::new(total))
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderSummary>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, COUNT(l.id) AS item_count, COALESCE(SUM(l.quantity), 0)::BIGINT AS total_items \
             FROM orders o LEFT JOIN order_lines l ON l.order_id = o.id \
             WHERE o.customer_id = $1 GROUP BY o.id ORDER BY o.created_at DESC, o.id DESC"
        );
        let rows = sqlx::query_as::<_, OrderSummaryRow>(&sql).bind(customer_id).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| -> Result<OrderSummary, StoreError> {
                Ok(OrderSummary { order: row.order.try_into()?, item_count: row.item_count, total_items: row.total_items })
            })
            .collect()
    }

    async fn order(&self, customer_id: CustomerId, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 AND o.customer_id = $2");
        let row = sqlx::query_as::<_, OrderRow>(&sql).bind(order_id).bind(customer_id).fetch_optional(&self.pool).await?;
        row.map(Order::try_from).transpose()
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineDetail>, StoreError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            "SELECT l.product_id, l.quantity, p.title, p.price, p.image \
             FROM order_lines l INNER JOIN products p ON p.id = l.product_id \
             WHERE l.order_id = $1 ORDER BY l.id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| OrderLineDetail {
                product_id: r.product_id,
                quantity: r.quantity,
                title: r.title,
                unit_price: Money::new(r.price),
                image: r.image,
            })
            .collect())
    }

    async fn payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, customer_id, order_id, amount, method, status, reference, receipt_image, created_at \
             FROM payments WHERE order_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Payment::try_from).transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgCheckoutTx;

    async fn begin(&self) -> Result<PgCheckoutTx, StoreError> {
        Ok(PgCheckoutTx { tx: self.pool.begin().await? })
    }
}

pub struct PgCheckoutTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Catalog for PgCheckoutTx {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(sqlx::query_as::<_, Product>(PRODUCT_BY_ID).bind(id).fetch_optional(&mut *self.tx).await?)
    }
}

#[async_trait]
impl CheckoutTx for PgCheckoutTx {
    async fn cart_lines(&mut self, customer_id: CustomerId) -> Result<Vec<CartLine>, StoreError> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT product_id, quantity FROM cart WHERE customer_id = $1 ORDER BY product_id",
        )
        .bind(customer_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(lines)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        let (id, created_at) = sqlx::query_as::<_, (OrderId, DateTime<Utc>)>(
            "INSERT INTO orders (customer_id, invoice_no, status, total_amount, delivery_address, delivery_phone, \
             special_instructions) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id, created_at",
        )
        .bind(order.customer_id)
        .bind(&order.invoice_no)
        .bind(OrderStatus::Pending.as_str())
        .bind(order.total.amount())
        .bind(&order.delivery.address)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.special_instructions)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(write_error)?;

        Ok(Order {
            id,
            customer_id: order.customer_id,
            invoice_no: order.invoice_no.clone(),
            status: OrderStatus::Pending,
            total: order.total,
            delivery: order.delivery.clone(),
            created_at,
        })
    }

    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO order_lines (order_id, product_id, quantity) VALUES ($1, $2, $3)")
            .bind(line.order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *self.tx)
            .await
            .map_err(write_error)?;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<PaymentId, StoreError> {
        let id = sqlx::query_scalar::<_, PaymentId>(
            "INSERT INTO payments (customer_id, order_id, amount, currency, method, status, reference, receipt_image) \
             VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7) RETURNING id",
        )
        .bind(payment.customer_id)
        .bind(payment.order_id)
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(payment.method.as_str())
        .bind(&payment.reference)
        .bind(&payment.receipt_image)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(id)
    }

    async fn commit(self) -> Result<(), StoreError> {
        Ok(self.tx.commit().await?)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(self.tx.rollback().await?)
    }
}
