//! Order domain.
//!
//! Orders are event-sourced aggregates: placing one appends `OrderPlaced`
//! with its lines, snapshotted prices and total; a single later decision
//! appends `OrderApproved` or `OrderDeclined`. The [`OrderLedger`] is the
//! entry point for writing and reading them.

pub mod aggregate;
pub mod command;
pub mod error;
pub mod order;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{CommandHandler, CommandResult};
pub use error::DomainError;
pub use order::{
    CustomerId, DecideOrder, LineItem, Money, Order, OrderError, OrderEvent, OrderLedger,
    OrderStatus, PlaceOrder, ProductId,
};
