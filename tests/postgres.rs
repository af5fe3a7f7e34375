//! Runs against a real database:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/food_test cargo test --test postgres -- --ignored
//! ```

use rust_decimal::Decimal;
use sqlx::PgPool;

use food_checkout::domain::aggregates::{Identity, PaymentMethod};
use food_checkout::services::{CheckoutRequest, CheckoutService, EventPublisher, OrderService, ReceiptStorage};
use food_checkout::store::postgres::{self, PgStore};
use food_checkout::store::CartStore;
use food_checkout::{CartService, CustomerId, OrderingError, ProductId, Quantity};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
    let pool = postgres::connect(&url, 2).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

async fn product(pool: &PgPool, title: &str, price: Decimal) -> ProductId {
    sqlx::query_scalar::<_, ProductId>("INSERT INTO products (title, price) VALUES ($1, $2) RETURNING id")
        .bind(title)
        .bind(price)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Large random ids keep concurrent runs from sharing carts.
fn fresh_customer() -> CustomerId {
    CustomerId::new(rand::random::<u32>() as i64 + 1_000_000).unwrap()
}

fn request() -> CheckoutRequest {
    CheckoutRequest {
        delivery_address: "12 Palm Street".into(),
        delivery_phone: "0801234567".into(),
        payment_method: PaymentMethod::Cash,
        ..Default::default()
    }
}

#[tokio::test]
#[ignore]
async fn test_cart_merges_and_keeps_scopes_apart() {
    let pool = pool().await;
    let store = PgStore::new(pool.clone());
    let rice = product(&pool, "Jollof rice", Decimal::new(1000, 2)).await;

    let me = Identity::Customer(fresh_customer());
    let guest = Identity::Anonymous(format!("10.9.{}.{}", rand::random::<u8>(), rand::random::<u8>()));
    store.add_item(&me, rice, Quantity::new(2).unwrap()).await.unwrap();
    store.add_item(&me, rice, Quantity::new(3).unwrap()).await.unwrap();
    store.add_item(&guest, rice, Quantity::ONE).await.unwrap();

    assert_eq!(store.item_count(&me).await.unwrap(), 5);
    assert_eq!(store.item_count(&guest).await.unwrap(), 1);
    assert_eq!(store.total(&me).await.unwrap().amount(), Decimal::new(5000, 2));

    assert!(store.update_item(&me, rice, Quantity::new(4).unwrap()).await.unwrap());
    assert_eq!(store.list_items(&me).await.unwrap()[0].quantity.get(), 4);
    assert_eq!(store.clear(&guest).await.unwrap(), 1);
    assert_eq!(store.item_count(&me).await.unwrap(), 4);
    assert_eq!(store.clear(&me).await.unwrap(), 1);
    assert_eq!(store.total(&me).await.unwrap().amount(), Decimal::ZERO);
}

#[tokio::test]
#[ignore]
async fn test_checkout_commits_order_lines_and_payment() {
    let pool = pool().await;
    let store = PgStore::new(pool.clone());
    let rice = product(&pool, "Jollof rice", Decimal::new(1000, 2)).await;
    let suya = product(&pool, "Suya platter", Decimal::new(2500, 2)).await;

    let customer = fresh_customer();
    let cart = CartService::new(store.clone());
    cart.add_to_cart(&Identity::Customer(customer), rice.get(), 2).await.unwrap();
    cart.add_to_cart(&Identity::Customer(customer), suya.get(), 1).await.unwrap();

    let checkout = CheckoutService::new(store.clone(), ReceiptStorage::new(std::env::temp_dir()), EventPublisher::disabled());
    let outcome = checkout.checkout(customer, request()).await.unwrap();
    assert_eq!(outcome.total_amount.amount(), Decimal::new(4500, 2));
    assert_eq!(cart.cart_item_count(&Identity::Customer(customer)).await.unwrap(), 0);

    let details = OrderService::new(store).order_details(customer, outcome.order_id.get()).await.unwrap();
    assert_eq!(details.lines.len(), 2);
    let payment = details.payment.unwrap();
    assert_eq!(payment.id, outcome.payment_id);
    assert_eq!(payment.amount, details.order.total);
}

#[tokio::test]
#[ignore]
async fn test_vanished_product_rolls_back() {
    let pool = pool().await;
    let store = PgStore::new(pool.clone());
    let rice = product(&pool, "Jollof rice", Decimal::new(1000, 2)).await;
    let gone = product(&pool, "Seasonal soup", Decimal::new(700, 2)).await;

    let customer = fresh_customer();
    let me = Identity::Customer(customer);
    store.add_item(&me, rice, Quantity::ONE).await.unwrap();
    store.add_item(&me, gone, Quantity::ONE).await.unwrap();
    sqlx::query("DELETE FROM products WHERE id = $1").bind(gone).execute(&pool).await.unwrap();

    let checkout = CheckoutService::new(store.clone(), ReceiptStorage::new(std::env::temp_dir()), EventPublisher::disabled());
    let err = checkout.checkout(customer, request()).await.unwrap_err();
    assert!(matches!(err, OrderingError::ProductNotFound(id) if id == gone));

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
        .bind(customer)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);
    assert_eq!(store.item_count(&me).await.unwrap(), 2);
}

#[tokio::test]
#[ignore]
async fn test_guest_add_merges_into_legacy_zero_row() {
    let pool = pool().await;
    let store = PgStore::new(pool.clone());
    let rice = product(&pool, "Jollof rice", Decimal::new(1000, 2)).await;
    let address = format!("10.8.{}.{}", rand::random::<u8>(), rand::random::<u8>());

    sqlx::query("INSERT INTO cart (product_id, customer_id, ip_add, quantity) VALUES ($1, 0, $2, 2)")
        .bind(rice)
        .bind(&address)
        .execute(&pool)
        .await
        .unwrap();

    let guest = Identity::Anonymous(address.clone());
    store.add_item(&guest, rice, Quantity::ONE).await.unwrap();

    let items = store.list_items(&guest).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity.get(), 3);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart WHERE ip_add = $1 AND product_id = $2")
        .bind(&address)
        .bind(rice)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}
