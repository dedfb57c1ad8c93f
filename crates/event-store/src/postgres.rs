use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, validate_events_for_append},
};

const SELECT_COLUMNS: &str =
    "SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata FROM events";

/// PostgreSQL-backed event store.
///
/// The `events` table carries a unique `(aggregate_id, version)` constraint, so
/// a lost race surfaces as `ConcurrencyConflict` even without an expected
/// version.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the workspace migrations (events and products tables).
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;
        let aggregate_id = events[0].aggregate_id;

        let mut tx = self.pool.begin().await?;

        if let Some(expected) = options.expected_version {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                    .bind(aggregate_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;

            let actual = Version::new(current.unwrap_or(0));
            if actual != expected {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected,
                    actual,
                });
            }
        }

        let mut last_version = Version::initial();
        for event in &events {
            sqlx::query(
                r#"
                INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.aggregate_id.as_uuid())
            .bind(&event.aggregate_type)
            .bind(event.version.as_i64())
            .bind(event.timestamp)
            .bind(&event.payload)
            .bind(serde_json::to_value(&event.metadata)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: options.expected_version.unwrap_or_default(),
                        actual: event.version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            last_version = event.version;
        }

        tx.commit().await?;
        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE aggregate_id = $1 ORDER BY version ASC"
        ))
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn get_events_by_aggregate_type(
        &self,
        aggregate_type: &str,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE aggregate_type = $1 ORDER BY position ASC"
        ))
        .bind(aggregate_type)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }
}
