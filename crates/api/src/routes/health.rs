//! Liveness endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use catalog::CatalogStore;
use event_store::EventStore;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Which storage the order journal and catalog live in.
    pub backend: &'static str,
}

/// GET /health
pub async fn check<S, C>(State(state): State<Arc<AppState<S, C>>>) -> Json<HealthResponse>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.backend,
    })
}
