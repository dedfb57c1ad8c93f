//! Start-up catalog seeding from a JSON file.

use std::path::Path;

use catalog::Product;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read catalog seed {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog seed {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads a JSON array of products:
///
/// ```json
/// [{"id": "SKU-001", "name": "Widget", "price": 1000, "stock": 25}]
/// ```
///
/// `price` is in cents.
pub async fn load_products(path: &Path) -> Result<Vec<Product>, SeedError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;

    parse_products(&raw).map_err(|source| SeedError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn parse_products(raw: &str) -> Result<Vec<Product>, serde_json::Error> {
    serde_json::from_str(raw)
}
