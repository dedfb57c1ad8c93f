//! Order lifecycle orchestration.
//!
//! [`LifecycleController`] is the one place that touches both the catalog and
//! the order ledger. Placing an order reserves stock first and records the
//! order second; if the record cannot be written the stock is given back.
//! Customer notifications go out after the fact through a [`Notifier`] and
//! never affect the outcome of the operation that triggered them.

pub mod controller;
pub mod error;
pub mod notifier;

pub use controller::LifecycleController;
pub use error::LifecycleError;
pub use notifier::{
    InMemoryNotifier, Notification, NotificationPayload, Notifier, NotifierError,
    TracingNotifier,
};
