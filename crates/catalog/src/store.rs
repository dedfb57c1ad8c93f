use async_trait::async_trait;
use common::ProductId;

use crate::{Product, error::Result};

/// Storage contract for the product catalog.
///
/// Stock only moves through `try_decrement` and its compensating `restore`.
/// Both must be indivisible with respect to concurrent callers on the same
/// product; calls on different products must not serialize on each other.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns the product, or `NotFound`.
    async fn get_product(&self, id: &ProductId) -> Result<Product>;

    /// Every product, ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Subtracts `quantity` if at least that much stock is on hand.
    ///
    /// Returns the remaining stock. Fails with `InsufficientStock` (leaving the
    /// stock untouched) or `NotFound`.
    async fn try_decrement(&self, id: &ProductId, quantity: u32) -> Result<u32>;

    /// Gives back `quantity` units taken by an earlier `try_decrement`.
    async fn restore(&self, id: &ProductId, quantity: u32) -> Result<u32>;
}
