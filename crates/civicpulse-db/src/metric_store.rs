//! Operations on the `metrics` table.
//!
//! A snapshot is the set of rows sharing one `ts`. The newest snapshot is
//! found with `MAX(ts)` and read back in full.

use civicpulse_types::{Metric, MetricName, UnknownVariant, ZoneId};
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `metrics` table.
pub struct MetricStore<'a> {
    pool: &'a PgPool,
}

impl<'a> MetricStore<'a> {
    /// Create a new metric store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a snapshot batch in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn batch_insert(&self, metrics: &[Metric]) -> Result<(), DbError> {
        if metrics.is_empty() {
            return Ok(());
        }

        let len = metrics.len();
        let mut timestamps = Vec::with_capacity(len);
        let mut zone_ids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut values = Vec::with_capacity(len);
        let mut explanations = Vec::with_capacity(len);

        for metric in metrics {
            timestamps.push(metric.ts);
            zone_ids.push(metric.zone_id.0.clone());
            names.push(metric.metric_name.as_str().to_owned());
            values.push(metric.value);
            explanations.push(metric.explanation.clone());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"INSERT INTO metrics (ts, zone_id, metric_name, value, explanation)
              SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::DOUBLE PRECISION[], $5::TEXT[])",
        )
        .bind(&timestamps)
        .bind(&zone_ids)
        .bind(&names)
        .bind(&values)
        .bind(&explanations)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(count = len, "Inserted metrics (batch UNNEST)");
        Ok(())
    }

    /// Timestamp of the newest snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest_ts(&self) -> Result<Option<i64>, DbError> {
        let ts: Option<i64> = sqlx::query_scalar("SELECT MAX(ts) FROM metrics")
            .fetch_one(self.pool)
            .await?;
        Ok(ts)
    }

    /// Every row of the snapshot stamped `ts`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn at(&self, ts: i64) -> Result<Vec<MetricRow>, DbError> {
        let rows = sqlx::query_as::<_, MetricRow>(
            r"SELECT id, ts, zone_id, metric_name, value, explanation
              FROM metrics
              WHERE ts = $1
              ORDER BY zone_id, id",
        )
        .bind(ts)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// The `limit` newest values of one metric for one zone, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn series(
        &self,
        zone_id: &ZoneId,
        metric: MetricName,
        limit: usize,
    ) -> Result<Vec<MetricRow>, DbError> {
        let rows = sqlx::query_as::<_, MetricRow>(
            r"SELECT id, ts, zone_id, metric_name, value, explanation
              FROM metrics
              WHERE zone_id = $1 AND metric_name = $2
              ORDER BY ts DESC, id DESC
              LIMIT $3",
        )
        .bind(&zone_id.0)
        .bind(metric.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// A row from the `metrics` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricRow {
    /// Auto-incremented row ID.
    pub id: i64,
    /// Snapshot timestamp, epoch seconds.
    pub ts: i64,
    /// Zone code.
    pub zone_id: String,
    /// Metric name.
    pub metric_name: String,
    /// Index value in `[0, 100]`.
    pub value: f64,
    /// Derivation text.
    pub explanation: String,
}

impl TryFrom<MetricRow> for Metric {
    type Error = DbError;

    fn try_from(row: MetricRow) -> Result<Self, Self::Error> {
        let metric_name = row
            .metric_name
            .parse()
            .map_err(|e: UnknownVariant| DbError::CorruptRow(format!("metric {}: {e}", row.id)))?;
        Ok(Self {
            ts: row.ts,
            zone_id: ZoneId(row.zone_id),
            metric_name,
            value: row.value,
            explanation: row.explanation,
        })
    }
}
