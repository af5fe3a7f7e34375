//! Order Aggregate
//!
//! Orders, their lines and payment records are append-only once checkout has
//! written them; status transitions happen in back-office tooling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::value_objects::{CustomerId, InvoiceNumber, Money, OrderId, PaymentId, ProductId, Quantity};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Rejected, Refunded }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { #[default] Cash, MobileMoney, BankTransfer, Pos }

impl PaymentMethod {
    /// Methods settled off-system, where the customer uploads proof of payment.
    pub fn requires_receipt(self) -> bool { matches!(self, Self::MobileMoney | Self::BankTransfer) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant { kind: &'static str, value: String }

macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str { match self { $(Self::$variant => $text),+ } }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending", Confirmed => "confirmed", Processing => "processing",
    Shipped => "shipped", Delivered => "delivered", Cancelled => "cancelled",
});
text_enum!(PaymentStatus, "payment status", {
    Pending => "pending", Paid => "paid", Rejected => "rejected", Refunded => "refunded",
});
text_enum!(PaymentMethod, "payment method", {
    Cash => "cash", MobileMoney => "mobile_money", BankTransfer => "bank_transfer", Pos => "pos",
});

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: String,
    pub phone: String,
    pub special_instructions: Option<String>,
}

impl DeliveryDetails {
    /// Trims every field; `None` when address or phone ends up blank.
    pub fn new(address: &str, phone: &str, special_instructions: &str) -> Option<Self> {
        let (address, phone, notes) = (address.trim(), phone.trim(), special_instructions.trim());
        if address.is_empty() || phone.is_empty() { return None; }
        Some(Self {
            address: address.to_string(),
            phone: phone.to_string(),
            special_instructions: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub invoice_no: InvoiceNumber,
    pub status: OrderStatus,
    pub total: Money,
    pub delivery: DeliveryDetails,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to write an order row; the store assigns the id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub invoice_no: InvoiceNumber,
    pub total: Money,
    pub delivery: DeliveryDetails,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// An order line joined with the live catalog entry, for order history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderLineDetail {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub title: String,
    pub unit_price: Money,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderSummary {
    #[serde(flatten)]
    pub order: Order,
    /// Distinct lines on the order.
    pub item_count: i64,
    /// Sum of line quantities.
    pub total_items: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub customer_id: CustomerId,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub receipt_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A self-reported payment, always recorded as pending.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPayment {
    pub customer_id: CustomerId,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub receipt_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("mobile_money".parse::<PaymentMethod>().unwrap(), PaymentMethod::MobileMoney);
        assert_eq!(" POS ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Pos);
        assert!("crypto".parse::<PaymentMethod>().is_err());
        assert!(PaymentMethod::BankTransfer.requires_receipt());
        assert!(!PaymentMethod::Cash.requires_receipt());
    }

    #[test]
    fn test_status_round_trip_text() {
        assert_eq!(OrderStatus::default().as_str(), "pending");
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!(PaymentStatus::default().to_string(), "pending");
    }

    #[test]
    fn test_delivery_details_require_address_and_phone() {
        assert!(DeliveryDetails::new("  ", "555-0100", "").is_none());
        assert!(DeliveryDetails::new("12 Palm Rd", "", "").is_none());
        let d = DeliveryDetails::new(" 12 Palm Rd ", "555-0100", "  ").unwrap();
        assert_eq!(d.address, "12 Palm Rd");
        assert_eq!(d.special_instructions, None);
    }
}
