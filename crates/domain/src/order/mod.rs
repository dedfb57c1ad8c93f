//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod ledger;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::{DecideOrder, PlaceOrder};
pub use events::{OrderDecisionData, OrderEvent, OrderPlacedData};
pub use ledger::OrderLedger;
pub use state::OrderStatus;
pub use value_objects::{CustomerId, LineItem, Money, ProductId};

use common::AggregateId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is already created.
    #[error("Order already created")]
    AlreadyCreated,

    #[error("Order must contain at least one line")]
    NoLines,

    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// The decision is not an allowed edge from the current status.
    #[error("Invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: AggregateId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Line subtotals overflow the cents representation.
    #[error("Order total does not fit in the money range")]
    TotalOverflow,

    /// A decision was issued for an order that was never placed.
    #[error("Order has not been placed")]
    NotPlaced,

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
