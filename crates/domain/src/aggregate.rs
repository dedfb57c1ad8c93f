//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded against an aggregate. Named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Name stored alongside the payload in the journal.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced entity.
///
/// State is never written directly: it is rebuilt by replaying the aggregate's
/// events through [`Aggregate::apply`], and changes are proposed as new events
/// by command methods that inspect the current state.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    type Error: std::error::Error + Send + Sync;

    /// Journal partition name, e.g. `"Order"`.
    fn aggregate_type() -> &'static str;

    /// `None` until the creating event has been applied.
    fn id(&self) -> Option<AggregateId>;

    /// Version of the last applied event; `Version::initial()` when new.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Folds one event into the state.
    ///
    /// Must be pure and infallible: events are facts that already happened.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
