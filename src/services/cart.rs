//! Cart operations exposed to the action layer.
//!
//! Every call takes the caller's [`Identity`] explicitly; nothing here reads
//! request or session state.

use crate::domain::aggregates::{CartItem, Identity};
use crate::domain::value_objects::{Money, ProductId, Quantity};
use crate::services::pricing::PricingResolver;
use crate::store::Store;
use crate::{OrderingError, Result};

#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self { Self { store } }

    /// Adds `quantity` of a product, merging into an existing line. The
    /// product must currently exist in the catalog.
    pub async fn add_to_cart(&self, identity: &Identity, product_id: i64, quantity: i64) -> Result<()> {
        let product_id = ProductId::new(product_id)?;
        let quantity = Quantity::new(quantity)?;
        let mut catalog = self.store.clone();
        let product = PricingResolver::resolve(&mut catalog, product_id).await?;
        self.store.add_item(identity, product_id, quantity).await?;
        tracing::debug!(%identity, %product_id, quantity = quantity.get(), title = %product.title, "Added to cart");
        Ok(())
    }

    /// Sets the quantity of an existing line. Callers route zero or negative
    /// quantities to [`Self::remove_from_cart`].
    pub async fn update_cart_item(&self, identity: &Identity, product_id: i64, quantity: i64) -> Result<()> {
        let product_id = ProductId::new(product_id)?;
        let quantity = Quantity::new(quantity)?;
        if !self.store.update_item(identity, product_id, quantity).await? {
            return Err(OrderingError::NotFound(format!("cart item for product {product_id}")));
        }
        Ok(())
    }

    pub async fn remove_from_cart(&self, identity: &Identity, product_id: i64) -> Result<()> {
        let product_id = ProductId::new(product_id)?;
        if !self.store.remove_item(identity, product_id).await? {
            return Err(OrderingError::NotFound(format!("cart item for product {product_id}")));
        }
        Ok(())
    }

    pub async fn list_cart(&self, identity: &Identity) -> Result<Vec<CartItem>> {
        Ok(self.store.list_items(identity).await?)
    }

    pub async fn empty_cart(&self, identity: &Identity) -> Result<()> {
        let removed = self.store.clear(identity).await?;
        tracing::debug!(%identity, removed, "Emptied cart");
        Ok(())
    }

    pub async fn cart_item_count(&self, identity: &Identity) -> Result<i64> {
        Ok(self.store.item_count(identity).await?)
    }

    pub async fn cart_total(&self, identity: &Identity) -> Result<Money> {
        Ok(self.store.total(identity).await?)
    }
}
