use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, validate_events_for_append},
};

#[derive(Default)]
struct Journal {
    events: Vec<EventEnvelope>,
    versions: HashMap<AggregateId, Version>,
}

/// In-memory event store.
///
/// Used by tests and by the server when no database is configured. Cloning
/// shares the underlying journal.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    journal: Arc<RwLock<Journal>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.journal.read().await.events.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let first_new_version = events[0].version;

        let mut journal = self.journal.write().await;
        let current = journal
            .versions
            .get(&aggregate_id)
            .copied()
            .unwrap_or_default();

        if let Some(expected) = options.expected_version
            && current != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current,
            });
        }

        // Same guarantee as the unique (aggregate_id, version) constraint in Postgres.
        if first_new_version != current.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current),
                actual: current,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(first_new_version);
        journal.versions.insert(aggregate_id, last_version);
        journal.events.extend(events);

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let journal = self.journal.read().await;
        let mut events: Vec<_> = journal
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn get_events_by_aggregate_type(
        &self,
        aggregate_type: &str,
    ) -> Result<Vec<EventEnvelope>> {
        let journal = self.journal.read().await;
        Ok(journal
            .events
            .iter()
            .filter(|e| e.aggregate_type == aggregate_type)
            .cloned()
            .collect())
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.journal.read().await.versions.get(&aggregate_id).copied())
    }
}
