//! Operations on the `scenarios` table.
//!
//! Parameters and both snapshots are stored as `JSONB`; they are only ever
//! read back whole.

use civicpulse_types::{ScenarioId, ScenarioResult, UnknownVariant};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `scenarios` table.
pub struct ScenarioStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ScenarioStore<'a> {
    /// Create a new scenario store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one scenario record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if a snapshot cannot be encoded
    /// and [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, result: &ScenarioResult) -> Result<(), DbError> {
        let params = serde_json::to_value(&result.params)?;
        let baseline = serde_json::to_value(&result.baseline)?;
        let scenario = serde_json::to_value(&result.scenario)?;

        sqlx::query(
            r"INSERT INTO scenarios (id, ts, scenario_name, params, baseline_ts, baseline, scenario)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(result.id.into_inner())
        .bind(result.ts)
        .bind(result.scenario_name.as_str())
        .bind(&params)
        .bind(result.baseline_ts)
        .bind(&baseline)
        .bind(&scenario)
        .execute(self.pool)
        .await?;

        tracing::debug!(
            scenario_id = %result.id,
            scenario = result.scenario_name.as_str(),
            "Inserted scenario record"
        );
        Ok(())
    }

    /// The `limit` newest records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<ScenarioRow>, DbError> {
        let rows = sqlx::query_as::<_, ScenarioRow>(
            r"SELECT id, ts, scenario_name, params, baseline_ts, baseline, scenario
              FROM scenarios
              ORDER BY ts DESC, id DESC
              LIMIT $1",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// A row from the `scenarios` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScenarioRow {
    /// Record ID (UUID v7).
    pub id: Uuid,
    /// Invocation time, epoch seconds.
    pub ts: i64,
    /// Scenario name.
    pub scenario_name: String,
    /// Parameters as submitted.
    pub params: serde_json::Value,
    /// Timestamp of the baseline snapshot.
    pub baseline_ts: i64,
    /// Baseline indices keyed by zone.
    pub baseline: serde_json::Value,
    /// Projected indices keyed by zone.
    pub scenario: serde_json::Value,
}

impl TryFrom<ScenarioRow> for ScenarioResult {
    type Error = DbError;

    fn try_from(row: ScenarioRow) -> Result<Self, Self::Error> {
        let scenario_name = row
            .scenario_name
            .parse()
            .map_err(|e: UnknownVariant| DbError::CorruptRow(format!("scenario {}: {e}", row.id)))?;
        Ok(Self {
            id: ScenarioId(row.id),
            ts: row.ts,
            scenario_name,
            params: serde_json::from_value(row.params)?,
            baseline_ts: row.baseline_ts,
            baseline: serde_json::from_value(row.baseline)?,
            scenario: serde_json::from_value(row.scenario)?,
        })
    }
}
