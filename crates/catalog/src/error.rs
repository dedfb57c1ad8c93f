//! Catalog and reservation error types.

use common::ProductId;
use thiserror::Error;

/// Errors raised by a [`CatalogStore`](crate::CatalogStore).
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product with this id.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The conditional decrement found less stock than requested.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A product record violates the catalog's invariants.
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors returned by [`ReservationEngine::reserve`](crate::ReservationEngine::reserve).
///
/// Business rejections carry enough detail for the caller to explain which
/// line failed and why. None of them are retried.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Empty line list or a non-positive quantity.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The catalog backend failed; the reservation was rolled back.
    #[error("Catalog error: {0}")]
    Catalog(CatalogError),
}

impl ReservationError {
    /// Short machine-readable name, used for metric labels and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ReservationError::InvalidRequest(_) => "InvalidRequest",
            ReservationError::ProductNotFound(_) => "ProductNotFound",
            ReservationError::InsufficientStock { .. } => "InsufficientStock",
            ReservationError::Catalog(_) => "CatalogFailure",
        }
    }
}

impl From<CatalogError> for ReservationError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(product_id) => ReservationError::ProductNotFound(product_id),
            CatalogError::InsufficientStock {
                product_id,
                requested,
                available,
            } => ReservationError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => ReservationError::Catalog(other),
        }
    }
}

/// Convenience type alias for catalog results.
pub type Result<T> = std::result::Result<T, CatalogError>;
