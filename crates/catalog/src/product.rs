use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in cents.
    pub price: Money,
    pub stock: u32,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
        }
    }

    /// Rejects records that may not enter the catalog.
    pub fn validate(&self) -> Result<()> {
        if self.price.is_negative() {
            return Err(CatalogError::InvalidProduct(format!(
                "{} has a negative price",
                self.id
            )));
        }
        if self.name.trim().is_empty() {
            return Err(CatalogError::InvalidProduct(format!(
                "{} has an empty name",
                self.id
            )));
        }
        Ok(())
    }
}
