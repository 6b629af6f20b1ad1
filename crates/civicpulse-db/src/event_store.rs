//! Operations on the `events` table.
//!
//! Events are the source of truth for every derived number in the system.
//! They are written in batches and read back by timestamp range, in
//! timestamp order with insertion order (`id`) breaking ties.

use civicpulse_types::{Domain, Event, UnknownVariant, ZoneId};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;

/// Rows per `UNNEST` insert statement.
const CHUNK_ROWS: usize = 500;

/// Operations on the `events` table.
pub struct EventStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert all events in one transaction.
    ///
    /// Rows are sent in `UNNEST` chunks of 500, but
    /// the transaction spans the whole slice: either every event is
    /// committed or none is.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any insert fails; the transaction
    /// is rolled back when dropped.
    pub async fn batch_insert(&self, events: &[Event]) -> Result<(), DbError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in events.chunks(CHUNK_ROWS) {
            insert_chunk(&mut tx, chunk).await?;
        }
        tx.commit().await?;

        tracing::debug!(count = events.len(), "Inserted events (batch UNNEST)");
        Ok(())
    }

    /// Events with `start <= ts <= end`, optionally for one domain.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn between(
        &self,
        start: i64,
        end: i64,
        domain: Option<Domain>,
    ) -> Result<Vec<EventRow>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT id, ts, zone_id, domain, payload
              FROM events
              WHERE ts >= $1 AND ts <= $2 AND ($3::TEXT IS NULL OR domain = $3)
              ORDER BY ts, id",
        )
        .bind(start)
        .bind(end)
        .bind(domain.map(Domain::as_str))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

async fn insert_chunk(conn: &mut PgConnection, chunk: &[Event]) -> Result<(), DbError> {
    let len = chunk.len();
    let mut timestamps = Vec::with_capacity(len);
    let mut zone_ids = Vec::with_capacity(len);
    let mut domains = Vec::with_capacity(len);
    let mut payloads = Vec::with_capacity(len);

    for event in chunk {
        timestamps.push(event.ts);
        zone_ids.push(event.zone_id.0.clone());
        domains.push(event.domain.as_str().to_owned());
        payloads.push(event.payload.clone());
    }

    sqlx::query(
        r"INSERT INTO events (ts, zone_id, domain, payload)
          SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::JSONB[])",
    )
    .bind(&timestamps)
    .bind(&zone_ids)
    .bind(&domains)
    .bind(&payloads)
    .execute(conn)
    .await?;

    Ok(())
}

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Auto-incremented row ID; the insertion order.
    pub id: i64,
    /// Reading time, epoch seconds.
    pub ts: i64,
    /// Zone code.
    pub zone_id: String,
    /// Domain name.
    pub domain: String,
    /// Domain-specific reading.
    pub payload: serde_json::Value,
}

impl TryFrom<EventRow> for Event {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let domain = row
            .domain
            .parse()
            .map_err(|e: UnknownVariant| DbError::CorruptRow(format!("event {}: {e}", row.id)))?;
        Ok(Self {
            ts: row.ts,
            zone_id: ZoneId(row.zone_id),
            domain,
            payload: row.payload,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(domain: &str) -> EventRow {
        EventRow {
            id: 7,
            ts: 1_700_000_000,
            zone_id: "Z03".to_owned(),
            domain: domain.to_owned(),
            payload: json!({ "volume": 420.0, "avg_speed": 31.5 }),
        }
    }

    #[test]
    fn row_converts_to_event() {
        let event = Event::try_from(row("traffic")).unwrap();
        assert_eq!(event.domain, Domain::Traffic);
        assert_eq!(event.zone_id, ZoneId::from("Z03"));
        assert_eq!(event.ts, 1_700_000_000);
    }

    #[test]
    fn unknown_domain_is_corrupt() {
        let err = Event::try_from(row("noise")).unwrap_err();
        assert!(matches!(err, DbError::CorruptRow(message) if message.starts_with("event 7")));
    }
}
