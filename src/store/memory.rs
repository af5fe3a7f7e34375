//! In-process store.
//!
//! Shared state sits behind one mutex that is never held across an await.
//! A [`MemoryTx`] reads the live cart and catalog but stages its own writes;
//! they become visible only on commit.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{CartStore, Catalog, CheckoutTx, OrderStore, Store, StoreError};
use crate::domain::aggregates::{
    Cart, CartItem, CartLine, Identity, NewOrder, NewPayment, Order, OrderLine, OrderLineDetail, OrderStatus,
    OrderSummary, Payment, PaymentStatus, Product,
};
use crate::domain::value_objects::{CustomerId, InvoiceNumber, Money, OrderId, PaymentId, ProductId, Quantity};

/// Write that a test can make fail, to exercise rollback paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailPoint { InsertOrder, InsertOrderLine, InsertPayment, Commit, ClearCart }

#[derive(Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    carts: HashMap<Identity, Cart>,
    orders: BTreeMap<OrderId, Order>,
    order_lines: Vec<OrderLine>,
    payments: BTreeMap<PaymentId, Payment>,
    last_order_id: i64,
    last_payment_id: i64,
    #[cfg(test)]
    fail_on: Option<FailPoint>,
    /// Product dropped from the catalog once a transaction has made this many lookups.
    #[cfg(test)]
    vanish: Option<(usize, ProductId)>,
}

impl State {
    fn invoice_taken(&self, invoice_no: &InvoiceNumber) -> bool {
        self.orders.values().any(|o| &o.invoice_no == invoice_no)
    }

    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        #[cfg(test)]
        if self.fail_on == Some(point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        let _ = point;
        Ok(())
    }

    fn before_lookup(&mut self, lookups_so_far: usize) {
        #[cfg(test)]
        if let Some((after, id)) = self.vanish {
            if lookups_so_far >= after {
                self.products.remove(&id);
            }
        }
        let _ = lookups_so_far;
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    /// Inserts or replaces a catalog entry.
    pub fn put_product(&self, product: Product) -> Result<(), StoreError> {
        self.lock()?.products.insert(product.id, product);
        Ok(())
    }

    pub fn remove_product(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.lock()?.products.remove(&id).is_some())
    }

    #[cfg(test)]
    pub(crate) fn fail_on(&self, point: Option<FailPoint>) { self.state.lock().unwrap().fail_on = point; }

    #[cfg(test)]
    pub(crate) fn vanish_after_lookups(&self, lookups: usize, id: ProductId) {
        self.state.lock().unwrap().vanish = Some((lookups, id));
    }

    #[cfg(test)]
    pub(crate) fn row_counts(&self) -> (usize, usize, usize) {
        let state = self.state.lock().unwrap();
        (state.orders.len(), state.order_lines.len(), state.payments.len())
    }
}

fn item(product: &Product, quantity: Quantity) -> CartItem {
    CartItem { product: product.clone(), quantity }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.lock()?.products.get(&id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn add_item(&self, identity: &Identity, product_id: ProductId, quantity: Quantity) -> Result<(), StoreError> {
        self.lock()?.carts.entry(identity.clone()).or_default().add_item(product_id, quantity);
        Ok(())
    }

    async fn update_item(&self, identity: &Identity, product_id: ProductId, quantity: Quantity) -> Result<bool, StoreError> {
        Ok(self.lock()?.carts.get_mut(identity).is_some_and(|cart| cart.update_quantity(product_id, quantity)))
    }

    async fn remove_item(&self, identity: &Identity, product_id: ProductId) -> Result<bool, StoreError> {
        Ok(self.lock()?.carts.get_mut(identity).is_some_and(|cart| cart.remove_item(product_id)))
    }

    async fn list_items(&self, identity: &Identity) -> Result<Vec<CartItem>, StoreError> {
        let state = self.lock()?;
        let Some(cart) = state.carts.get(identity) else { return Ok(Vec::new()) };
        // inner join: lines whose product left the catalog are not listed
        Ok(cart.lines().filter_map(|line| state.products.get(&line.product_id).map(|p| item(p, line.quantity))).collect())
    }

    async fn clear(&self, identity: &Identity) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        state.check(FailPoint::ClearCart)?;
        Ok(state.carts.remove(identity).map_or(0, |cart| cart.lines().count() as u64))
    }

    async fn item_count(&self, identity: &Identity) -> Result<i64, StoreError> {
        Ok(self.lock()?.carts.get(identity).map_or(0, Cart::item_count))
    }

    async fn total(&self, identity: &Identity) -> Result<Money, StoreError> {
        let items = self.list_items(identity).await?;
        Ok(items.iter().map(CartItem::subtotal).sum())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<OrderSummary>, StoreError> {
        let state = self.lock()?;
        let mut summaries: Vec<OrderSummary> = state
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .map(|order| {
                let lines = state.order_lines.iter().filter(|l| l.order_id == order.id);
                let (item_count, total_items) = lines.fold((0, 0), |(n, q), l| (n + 1, q + i64::from(l.quantity.get())));
                OrderSummary { order: order.clone(), item_count, total_items }
            })
            .collect();
        summaries.sort_by(|a, b| (b.order.created_at, b.order.id).cmp(&(a.order.created_at, a.order.id)));
        Ok(summaries)
    }

    async fn order(&self, customer_id: CustomerId, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock()?.orders.get(&order_id).filter(|o| o.customer_id == customer_id).cloned())
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineDetail>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .filter_map(|l| {
                state.products.get(&l.product_id).map(|p| OrderLineDetail {
                    product_id: l.product_id,
                    quantity: l.quantity,
                    title: p.title.clone(),
                    unit_price: p.unit_price(),
                    image: p.image.clone(),
                })
            })
            .collect())
    }

    async fn payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, StoreError> {
        Ok(self.lock()?.payments.values().rev().find(|p| p.order_id == order_id).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx { store: self.clone(), lookups: 0, orders: Vec::new(), lines: Vec::new(), payments: Vec::new() })
    }
}

pub struct MemoryTx {
    store: MemoryStore,
    lookups: usize,
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
    payments: Vec<Payment>,
}

#[async_trait]
impl Catalog for MemoryTx {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let mut state = self.store.lock()?;
        state.before_lookup(self.lookups);
        self.lookups += 1;
        Ok(state.products.get(&id).cloned())
    }
}

#[async_trait]
impl CheckoutTx for MemoryTx {
    async fn cart_lines(&mut self, customer_id: CustomerId) -> Result<Vec<CartLine>, StoreError> {
        let state = self.store.lock()?;
        Ok(state.carts.get(&Identity::Customer(customer_id)).map(|c| c.lines().collect()).unwrap_or_default())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, StoreError> {
        let mut state = self.store.lock()?;
        state.check(FailPoint::InsertOrder)?;
        if state.invoice_taken(&order.invoice_no) || self.orders.iter().any(|o| o.invoice_no == order.invoice_no) {
            return Err(StoreError::Conflict(format!("invoice number {} already exists", order.invoice_no)));
        }
        state.last_order_id += 1;
        let id = OrderId::new(state.last_order_id).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let written = Order {
            id,
            customer_id: order.customer_id,
            invoice_no: order.invoice_no.clone(),
            status: OrderStatus::Pending,
            total: order.total,
            delivery: order.delivery.clone(),
            created_at: Utc::now(),
        };
        self.orders.push(written.clone());
        Ok(written)
    }

    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<(), StoreError> {
        self.store.lock()?.check(FailPoint::InsertOrderLine)?;
        self.lines.push(*line);
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<PaymentId, StoreError> {
        let mut state = self.store.lock()?;
        state.check(FailPoint::InsertPayment)?;
        state.last_payment_id += 1;
        let id = PaymentId::new(state.last_payment_id).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.payments.push(Payment {
            id,
            customer_id: payment.customer_id,
            order_id: payment.order_id,
            amount: payment.amount,
            method: payment.method,
            status: PaymentStatus::Pending,
            reference: payment.reference.clone(),
            receipt_image: payment.receipt_image.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut state = self.store.lock()?;
        state.check(FailPoint::Commit)?;
        if let Some(dup) = self.orders.iter().find(|o| state.invoice_taken(&o.invoice_no)) {
            return Err(StoreError::Conflict(format!("invoice number {} already exists", dup.invoice_no)));
        }
        state.orders.extend(self.orders.into_iter().map(|o| (o.id, o)));
        state.order_lines.extend(self.lines);
        state.payments.extend(self.payments.into_iter().map(|p| (p.id, p)));
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> { Ok(()) }
}
