//! Domain events
use serde::Serialize;
use crate::domain::aggregates::PaymentMethod;
use crate::domain::value_objects::{CustomerId, InvoiceNumber, Money, OrderId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed {
        order_id: OrderId,
        invoice_no: InvoiceNumber,
        customer_id: CustomerId,
        total: Money,
        payment_method: PaymentMethod,
    },
}

impl OrderEvent {
    pub fn subject(&self) -> &'static str {
        match self { Self::Placed { .. } => "orders.placed" }
    }
}
