//! HTTP handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use catalog::CatalogStore;
use event_store::EventStore;
use lifecycle::LifecycleController;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore, C: CatalogStore> {
    pub controller: LifecycleController<S, C>,
    /// `"in-memory"` or `"postgres"`, reported by `/health`.
    pub backend: &'static str,
}
