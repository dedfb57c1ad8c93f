//! In-memory catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, ProductId};
use tokio::sync::{Mutex, RwLock};

use crate::error::{CatalogError, Result};
use crate::{CatalogStore, Product};

type Entry = Arc<Mutex<Product>>;

/// In-memory catalog with one lock per product.
///
/// The outer map lock is only held long enough to find a product's entry; the
/// check-and-subtract itself runs under that product's own mutex, so
/// decrements on different products proceed in parallel.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<BTreeMap<ProductId, Entry>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog pre-populated with `products`.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for product in products {
            product.validate()?;
            map.insert(product.id.clone(), Arc::new(Mutex::new(product)));
        }
        Ok(Self {
            products: Arc::new(RwLock::new(map)),
        })
    }

    /// Inserts or replaces a product record (catalog management, seeding).
    pub async fn upsert(&self, product: Product) -> Result<()> {
        product.validate()?;
        let mut products = self.products.write().await;
        match products.get(&product.id) {
            Some(entry) => *entry.lock().await = product,
            None => {
                products.insert(product.id.clone(), Arc::new(Mutex::new(product)));
            }
        }
        Ok(())
    }

    /// Changes a product's list price. Existing orders keep their snapshot.
    pub async fn set_price(&self, id: &ProductId, price: Money) -> Result<()> {
        if price.is_negative() {
            return Err(CatalogError::InvalidProduct(format!(
                "{id} cannot have a negative price"
            )));
        }
        self.entry(id).await?.lock().await.price = price;
        Ok(())
    }

    async fn entry(&self, id: &ProductId) -> Result<Entry> {
        self.products
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Product> {
        let entry = self.entry(id).await?;
        let product = entry.lock().await.clone();
        Ok(product)
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let entries: Vec<Entry> = self.products.read().await.values().cloned().collect();
        let mut products = Vec::with_capacity(entries.len());
        for entry in entries {
            products.push(entry.lock().await.clone());
        }
        Ok(products)
    }

    async fn try_decrement(&self, id: &ProductId, quantity: u32) -> Result<u32> {
        let entry = self.entry(id).await?;
        let mut product = entry.lock().await;
        if product.stock < quantity {
            return Err(CatalogError::InsufficientStock {
                product_id: id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        Ok(product.stock)
    }

    async fn restore(&self, id: &ProductId, quantity: u32) -> Result<u32> {
        let entry = self.entry(id).await?;
        let mut product = entry.lock().await;
        product.stock = product.stock.saturating_add(quantity);
        Ok(product.stock)
    }
}
