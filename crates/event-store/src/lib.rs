//! Append-only event journal.
//!
//! Orders are never updated in place: every state change is appended as an
//! event carrying the aggregate version it produces. Appends are guarded by
//! optimistic concurrency so two writers racing on the same aggregate cannot
//! both succeed.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore};
