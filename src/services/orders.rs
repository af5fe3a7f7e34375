//! Order history for signed-in customers.

use serde::Serialize;

use crate::domain::aggregates::{Order, OrderLineDetail, OrderSummary, Payment};
use crate::domain::value_objects::{CustomerId, OrderId};
use crate::store::Store;
use crate::{OrderingError, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLineDetail>,
    pub payment: Option<Payment>,
}

#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self { Self { store } }

    /// Newest first, with line and item counts.
    pub async fn past_orders(&self, customer_id: CustomerId) -> Result<Vec<OrderSummary>> {
        Ok(self.store.orders_for_customer(customer_id).await?)
    }

    /// An order belonging to another customer is reported as missing.
    pub async fn order_details(&self, customer_id: CustomerId, order_id: i64) -> Result<OrderDetails> {
        let order_id = OrderId::new(order_id)?;
        let order = self
            .store
            .order(customer_id, order_id)
            .await?
            .ok_or_else(|| OrderingError::NotFound(format!("order {order_id}")))?;
        let lines = self.store.order_lines(order.id).await?;
        let payment = self.store.payment_for_order(order.id).await?;
        Ok(OrderDetails { order, lines, payment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Identity, PaymentMethod, Product};
    use crate::domain::value_objects::{ProductId, Quantity};
    use crate::services::events::EventPublisher;
    use crate::services::receipts::ReceiptStorage;
    use crate::services::{CheckoutRequest, CheckoutService};
    use crate::store::memory::MemoryStore;
    use crate::store::CartStore;
    use rust_decimal::Decimal;

    async fn place(store: &MemoryStore, customer: CustomerId, lines: &[(i64, i64)]) -> OrderId {
        let me = Identity::Customer(customer);
        for &(product, qty) in lines {
            store.add_item(&me, ProductId::new(product).unwrap(), Quantity::new(qty).unwrap()).await.unwrap();
        }
        let checkout = CheckoutService::new(store.clone(), ReceiptStorage::new(std::env::temp_dir()), EventPublisher::disabled());
        let request = CheckoutRequest {
            delivery_address: "4 Market Road".into(),
            delivery_phone: "0700000000".into(),
            payment_method: PaymentMethod::Pos,
            ..Default::default()
        };
        checkout.checkout(customer, request).await.unwrap().order_id
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, cents) in [(5, 1000), (7, 2500)] {
            store
                .put_product(Product {
                    id: ProductId::new(id).unwrap(),
                    title: format!("Dish {id}"),
                    price: Decimal::new(cents, 2),
                    image: None,
                    description: None,
                })
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_past_orders_newest_first_with_counts() {
        let store = store();
        let me = CustomerId::new(11).unwrap();
        let first = place(&store, me, &[(5, 2), (7, 1)]).await;
        let second = place(&store, me, &[(7, 4)]).await;
        place(&store, CustomerId::new(12).unwrap(), &[(5, 1)]).await;

        let orders = OrderService::new(store).past_orders(me).await.unwrap();
        let ids: Vec<OrderId> = orders.iter().map(|o| o.order.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!((orders[1].item_count, orders[1].total_items), (2, 3));
        assert_eq!((orders[0].item_count, orders[0].total_items), (1, 4));
    }

    #[tokio::test]
    async fn test_details_include_lines_and_payment() {
        let store = store();
        let me = CustomerId::new(11).unwrap();
        let id = place(&store, me, &[(5, 2), (7, 1)]).await;

        let details = OrderService::new(store).order_details(me, id.get()).await.unwrap();
        assert_eq!(details.order.total.amount(), Decimal::new(4500, 2));
        assert_eq!(details.lines.len(), 2);
        assert_eq!(details.lines[0].title, "Dish 5");
        let payment = details.payment.unwrap();
        assert_eq!(payment.method, PaymentMethod::Pos);
        assert_eq!(payment.amount, details.order.total);
    }

    #[tokio::test]
    async fn test_foreign_or_unknown_orders_are_not_found() {
        let store = store();
        let id = place(&store, CustomerId::new(11).unwrap(), &[(5, 1)]).await;
        let orders = OrderService::new(store);
        let stranger = CustomerId::new(12).unwrap();

        assert!(matches!(orders.order_details(stranger, id.get()).await, Err(OrderingError::NotFound(_))));
        assert!(matches!(orders.order_details(stranger, 9_999).await, Err(OrderingError::NotFound(_))));
        assert!(matches!(orders.order_details(stranger, 0).await, Err(OrderingError::InvalidInput(_))));
    }
}
