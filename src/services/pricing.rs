//! Pricing resolver: current catalog prices, looked up every time.

use crate::domain::aggregates::{CartLine, Product};
use crate::domain::value_objects::{Money, ProductId};
use crate::store::Catalog;
use crate::{OrderingError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct PricedLine {
    pub line: CartLine,
    pub product: Product,
    pub subtotal: Money,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub total: Money,
}

pub struct PricingResolver;

impl PricingResolver {
    pub async fn resolve<C: Catalog>(catalog: &mut C, id: ProductId) -> Result<Product> {
        catalog.find_product(id).await?.ok_or(OrderingError::ProductNotFound(id))
    }

    /// Prices every line at the catalog's current price, ignoring anything the
    /// cart may have seen when the line was added.
    pub async fn price<C: Catalog>(catalog: &mut C, lines: &[CartLine]) -> Result<PricedCart> {
        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let product = Self::resolve(catalog, line.product_id).await?;
            let subtotal = product.unit_price().multiply(line.quantity);
            priced.push(PricedLine { line: *line, product, subtotal });
        }
        let total = priced.iter().map(|l| l.subtotal).sum();
        Ok(PricedCart { lines: priced, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Quantity;
    use crate::store::memory::MemoryStore;
    use rust_decimal::Decimal;

    fn product(id: i64, cents: i64) -> Product {
        Product { id: ProductId::new(id).unwrap(), title: format!("Dish {id}"), price: Decimal::new(cents, 2), image: None, description: None }
    }

    fn line(id: i64, qty: i64) -> CartLine {
        CartLine { product_id: ProductId::new(id).unwrap(), quantity: Quantity::new(qty).unwrap() }
    }

    #[tokio::test]
    async fn test_prices_from_live_catalog() {
        let mut store = MemoryStore::new();
        store.put_product(product(5, 1000)).unwrap();
        store.put_product(product(7, 2500)).unwrap();
        let priced = PricingResolver::price(&mut store, &[line(5, 2), line(7, 1)]).await.unwrap();
        assert_eq!(priced.total.amount(), Decimal::new(4500, 2));

        store.put_product(product(7, 3000)).unwrap();
        let priced = PricingResolver::price(&mut store, &[line(5, 2), line(7, 1)]).await.unwrap();
        assert_eq!(priced.total.amount(), Decimal::new(5000, 2));
    }

    #[tokio::test]
    async fn test_missing_product_is_named() {
        let mut store = MemoryStore::new();
        store.put_product(product(5, 1000)).unwrap();
        let err = PricingResolver::price(&mut store, &[line(5, 1), line(9, 1)]).await.unwrap_err();
        assert!(matches!(err, OrderingError::ProductNotFound(id) if id.get() == 9));
    }
}
