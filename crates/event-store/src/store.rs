use async_trait::async_trait;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected version of the aggregate for optimistic concurrency control.
    /// If None, no version check is performed.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Expect the aggregate to be at `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Expect the aggregate to not exist yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }
}

/// Persistence contract for the append-only journal.
///
/// Implementations must be thread-safe and must make `append` atomic: either
/// every envelope in the batch is stored or none is.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events for one aggregate.
    ///
    /// Fails with `ConcurrencyConflict` when `options.expected_version` does not
    /// match the stored version. Returns the aggregate version after the append.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// All events of one aggregate, oldest first.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// All events of every aggregate of the given kind, in append order.
    async fn get_events_by_aggregate_type(
        &self,
        aggregate_type: &str,
    ) -> Result<Vec<EventEnvelope>>;

    /// Current version of an aggregate, or None if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;
}

/// Checks that a batch targets a single aggregate with contiguous versions.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected = first.version;
    for event in events.iter().skip(1) {
        if event.aggregate_id != first.aggregate_id
            || event.aggregate_type != first.aggregate_type
        {
            return Err(EventStoreError::InvalidAppend(
                "all events in a batch must belong to the same aggregate".to_string(),
            ));
        }
        expected = expected.next();
        if event.version != expected {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential: expected {expected}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}
