//! Cart Aggregate

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{CustomerId, Money, ProductId, Quantity};

/// Who a cart belongs to. An authenticated customer always wins over the
/// network address, and the two scopes never match each other's rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Identity {
    Customer(CustomerId),
    Anonymous(String),
}

impl Identity {
    pub const UNKNOWN_ADDRESS: &'static str = "0.0.0.0";

    pub fn resolve(customer_id: Option<i64>, address: &str) -> Self {
        match customer_id.and_then(|id| CustomerId::new(id).ok()) {
            Some(id) => Self::Customer(id),
            None if address.trim().is_empty() => Self::Anonymous(Self::UNKNOWN_ADDRESS.to_string()),
            None => Self::Anonymous(address.trim().to_string()),
        }
    }

    pub fn customer(&self) -> Option<CustomerId> {
        match self { Self::Customer(id) => Some(*id), Self::Anonymous(_) => None }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Customer(id) => write!(f, "customer:{id}"), Self::Anonymous(addr) => write!(f, "guest:{addr}") }
    }
}

/// One stored cart row: a product and how many of it, scoped to an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A cart line joined with the live catalog entry it points at.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct CartItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub product: Product,
    pub quantity: Quantity,
}

impl CartItem {
    pub fn subtotal(&self) -> Money { self.product.unit_price().multiply(self.quantity) }
}

/// Lines held by one identity, at most one per product.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    lines: BTreeMap<ProductId, Quantity>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn lines(&self) -> impl Iterator<Item = CartLine> + '_ {
        self.lines.iter().map(|(&product_id, &quantity)| CartLine { product_id, quantity })
    }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn item_count(&self) -> i64 { self.lines.values().map(|q| i64::from(q.get())).sum() }

    /// Merges into an existing line instead of adding a second one.
    pub fn add_item(&mut self, product_id: ProductId, quantity: Quantity) {
        self.lines
            .entry(product_id)
            .and_modify(|existing| *existing = existing.saturating_add(quantity))
            .or_insert(quantity);
    }

    pub fn update_quantity(&mut self, product_id: ProductId, quantity: Quantity) -> bool {
        match self.lines.get_mut(&product_id) {
            Some(existing) => { *existing = quantity; true }
            None => false,
        }
    }

    pub fn remove_item(&mut self, product_id: ProductId) -> bool { self.lines.remove(&product_id).is_some() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: i64) -> ProductId { ProductId::new(id).unwrap() }
    fn qty(n: i64) -> Quantity { Quantity::new(n).unwrap() }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new();
        cart.add_item(pid(1), qty(2));
        cart.add_item(pid(1), qty(3));
        assert_eq!(cart.lines().count(), 1); // Merged
        assert_eq!(cart.item_count(), 5);
        assert!(cart.update_quantity(pid(1), qty(1)));
        assert!(!cart.update_quantity(pid(2), qty(1)));
        assert!(cart.remove_item(pid(1)));
        assert!(!cart.remove_item(pid(1)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_lines_are_ordered_by_product() {
        let mut cart = Cart::new();
        cart.add_item(pid(7), qty(1));
        cart.add_item(pid(5), qty(2));
        let ids: Vec<i64> = cart.lines().map(|l| l.product_id.get()).collect();
        assert_eq!(ids, vec![5, 7]);
    }

    #[test]
    fn test_identity_resolution() {
        assert_eq!(Identity::resolve(Some(4), "10.0.0.1"), Identity::Customer(CustomerId::new(4).unwrap()));
        assert_eq!(Identity::resolve(Some(0), "10.0.0.1"), Identity::Anonymous("10.0.0.1".into()));
        assert_eq!(Identity::resolve(None, "  "), Identity::Anonymous("0.0.0.0".into()));
    }
}
