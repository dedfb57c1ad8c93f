//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use catalog::{InMemoryCatalog, PostgresCatalog, Product};
use event_store::{InMemoryEventStore, PostgresEventStore};
use lifecycle::{Notifier, TracingNotifier};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: &Config, app: axum::Router) {
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

async fn run_in_memory(config: &Config, seed: Vec<Product>, metrics_handle: PrometheusHandle) {
    let catalog = InMemoryCatalog::from_products(seed).expect("invalid catalog seed");
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let state = api::create_state(
        InMemoryEventStore::new(),
        catalog,
        notifier,
        config.notify_timeout,
        "in-memory",
    );
    serve(config, api::create_app(state, metrics_handle)).await;
}

async fn run_postgres(
    config: &Config,
    database_url: &str,
    seed: Vec<Product>,
    metrics_handle: PrometheusHandle,
) {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .expect("failed to connect to database");

    let event_store = PostgresEventStore::new(pool.clone());
    event_store
        .run_migrations()
        .await
        .expect("failed to run migrations");

    let catalog = PostgresCatalog::new(pool);
    for product in seed {
        catalog
            .upsert(product)
            .await
            .expect("failed to seed catalog");
    }

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let state = api::create_state(
        event_store,
        catalog,
        notifier,
        config.notify_timeout,
        "postgres",
    );
    serve(config, api::create_app(state, metrics_handle)).await;
}

#[tokio::main]
async fn main() {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Catalog seed
    let seed = match &config.catalog_seed {
        Some(path) => api::seed::load_products(path)
            .await
            .expect("failed to load catalog seed"),
        None => Vec::new(),
    };
    tracing::info!(products = seed.len(), "catalog seed loaded");

    // 4. Stores, state and server
    match config.database_url.clone() {
        Some(url) => run_postgres(&config, &url, seed, metrics_handle).await,
        None => run_in_memory(&config, seed, metrics_handle).await,
    }
}
