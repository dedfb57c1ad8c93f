//! HTTP API server for order placement and fulfillment.
//!
//! Exposes the catalog, order placement and order decisions over REST, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use catalog::CatalogStore;
use event_store::EventStore;
use lifecycle::{LifecycleController, Notifier};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, C>(state: Arc<AppState<S, C>>, metrics_handle: PrometheusHandle) -> Router
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, C>))
        .route("/products", get(routes::products::list::<S, C>))
        .route("/products/{id}", get(routes::products::get::<S, C>))
        .route(
            "/orders",
            post(routes::orders::place::<S, C>).get(routes::orders::list_all::<S, C>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S, C>))
        .route("/orders/{id}/status", put(routes::orders::set_status::<S, C>))
        .route("/orders/{id}/events", get(routes::orders::events::<S, C>))
        .route(
            "/customers/{customer_id}/orders",
            get(routes::orders::list_for_customer::<S, C>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the stores and notifier into shared application state.
pub fn create_state<S, C>(
    event_store: S,
    catalog: C,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
    backend: &'static str,
) -> Arc<AppState<S, C>>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    Arc::new(AppState {
        controller: LifecycleController::with_notify_timeout(
            event_store,
            catalog,
            notifier,
            notify_timeout,
        ),
        backend,
    })
}
