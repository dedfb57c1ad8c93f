//! Lifecycle error types.

use catalog::ReservationError;
use domain::{DomainError, OrderError};
use thiserror::Error;

/// Errors returned by [`LifecycleController`](crate::LifecycleController).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Stock could not be reserved; nothing changed.
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    /// The ledger rejected or failed the write.
    #[error(transparent)]
    Ledger(#[from] DomainError),

    /// The background task running the operation died.
    #[error("Operation aborted: {0}")]
    Aborted(String),
}

impl LifecycleError {
    /// Short machine-readable name, used for metric labels and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Reservation(e) => e.kind(),
            LifecycleError::Ledger(DomainError::Order(OrderError::InvalidTransition { .. })) => {
                "InvalidTransition"
            }
            LifecycleError::Ledger(DomainError::Order(_)) => "InvalidRequest",
            LifecycleError::Ledger(DomainError::AggregateNotFound { .. }) => "OrderNotFound",
            LifecycleError::Ledger(e) if e.is_conflict() => "Conflict",
            LifecycleError::Ledger(_) => "LedgerFailure",
            LifecycleError::Aborted(_) => "Aborted",
        }
    }
}
