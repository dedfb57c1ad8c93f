//! Command handling infrastructure.

use std::collections::HashMap;
use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Loads aggregates from an [`EventStore`] and persists the events that
/// commands produce.
///
/// Every append carries the version the command was decided against, so a
/// writer that lost a race gets `ConcurrencyConflict` instead of silently
/// interleaving its events.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replays an aggregate's events. Unknown ids yield `A::default()`.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let events = self.store.get_events_for_aggregate(aggregate_id).await?;

        let mut aggregate = A::default();
        for envelope in events {
            let event: A::Event = envelope.decode()?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        if aggregate.id().is_some() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Rebuilds every aggregate of this type, in order of first append.
    pub async fn load_all(&self) -> Result<Vec<A>, DomainError> {
        let events = self
            .store
            .get_events_by_aggregate_type(A::aggregate_type())
            .await?;

        let mut order: Vec<AggregateId> = Vec::new();
        let mut aggregates: HashMap<AggregateId, A> = HashMap::new();

        for envelope in events {
            let event: A::Event = envelope.decode()?;
            let aggregate = aggregates.entry(envelope.aggregate_id).or_insert_with(|| {
                order.push(envelope.aggregate_id);
                A::default()
            });
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(order
            .into_iter()
            .filter_map(|id| aggregates.remove(&id))
            .collect())
    }

    /// Executes a command and persists the resulting events.
    ///
    /// `command_fn` sees the current state and either proposes events or
    /// rejects the command. Nothing is written when it proposes none.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let envelopes = build_envelopes::<A>(aggregate_id, current_version, &events)?;

        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };

        let new_version = self.store.append(envelopes, options).await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }
}

fn build_envelopes<A: Aggregate>(
    aggregate_id: AggregateId,
    current_version: Version,
    events: &[A::Event],
) -> Result<Vec<EventEnvelope>, DomainError> {
    let mut envelopes = Vec::with_capacity(events.len());
    let mut version = current_version;

    for event in events {
        version = version.next();
        envelopes.push(EventEnvelope::record(
            aggregate_id,
            A::aggregate_type(),
            event.event_type(),
            version,
            event,
        )?);
    }

    Ok(envelopes)
}
