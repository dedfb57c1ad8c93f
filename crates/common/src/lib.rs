//! Shared value types used across the order placement workspace.

mod types;

pub use types::{AggregateId, CustomerId, Money, ProductId};
