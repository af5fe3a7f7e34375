//! Catalog product as seen by the cart and checkout flow.
//!
//! The catalog itself is owned elsewhere; this side only ever reads it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl Product {
    pub fn unit_price(&self) -> Money { Money::new(self.price) }
}
