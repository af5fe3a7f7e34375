//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::Product;
pub use order::{
    DeliveryDetails, NewOrder, NewPayment, Order, OrderLine, OrderLineDetail, OrderStatus, OrderSummary, Payment,
    PaymentMethod, PaymentStatus, UnknownVariant,
};
pub use cart::{Cart, CartItem, CartLine, Identity};
