//! Catalog read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use catalog::{CatalogStore, Product};
use common::ProductId;
use event_store::EventStore;
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            price_cents: product.price.cents(),
            stock: product.stock,
        }
    }
}

/// GET /products: every product, ordered by id.
#[tracing::instrument(skip(state))]
pub async fn list<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let products = state.controller.catalog().list_products().await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let product = state
        .controller
        .catalog()
        .get_product(&ProductId::new(id))
        .await?;
    Ok(Json(product.into()))
}
