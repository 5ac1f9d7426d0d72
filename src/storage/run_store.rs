//! Run record storage facade.
//!
//! CRUD operations for probe run records plus the aggregate query backing
//! the dashboard stat cards.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::storage::types::TestRun;
use crate::storage::{SqlitePool, StorageError};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1_000;

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

/// Query for run records.
#[derive(Debug, Clone, Default)]
pub struct RunQuery {
    pub limit: Option<u32>,
    pub order: Option<SortOrder>,
}

/// Aggregate figures for the dashboard cards.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunStats {
    pub total_runs: i64,
    /// Mean of the per-run average latencies; 0 when there are no runs.
    pub avg_latency_ms: f64,
    /// Percentage of runs that observed at least one 2xx response.
    pub success_rate_pct: f64,
}

/// Storage facade for probe run records.
#[derive(Clone)]
pub struct RunStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for RunStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStore").finish_non_exhaustive()
    }
}

impl RunStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a run record.
    pub async fn insert(&self, run: &TestRun) -> Result<(), StorageError> {
        let status_counts = serde_json::to_string(&run.status_counts)?;

        sqlx::query(
            "INSERT INTO test_runs
                 (id, url, method, avg_latency_ms, min_latency_ms, max_latency_ms,
                  status_counts, tips, ok, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&run.id)
        .bind(&run.url)
        .bind(&run.method)
        .bind(run.avg_latency_ms)
        .bind(run.min_latency_ms)
        .bind(run.max_latency_ms)
        .bind(status_counts)
        .bind(&run.tips)
        .bind(run.ok)
        .bind(run.created_at)
        .execute(self.pool.inner())
        .await?;

        tracing::debug!(id = %run.id, url = %run.url, "Run record inserted");
        Ok(())
    }

    /// List run records, newest first by default.
    pub async fn list(&self, q: RunQuery) -> Result<Vec<TestRun>, StorageError> {
        let limit = q.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let order = q.order.unwrap_or_default();

        let sql = format!(
            "SELECT id, url, method, avg_latency_ms, min_latency_ms, max_latency_ms,
                    status_counts, tips, ok, created_at
             FROM test_runs ORDER BY created_at {} LIMIT ?1",
            order.as_sql()
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool.inner())
            .await?;

        rows.iter().map(map_run_row).collect()
    }

    /// Get a run record by id.
    pub async fn get(&self, id: &str) -> Result<Option<TestRun>, StorageError> {
        let row = sqlx::query(
            "SELECT id, url, method, avg_latency_ms, min_latency_ms, max_latency_ms,
                    status_counts, tips, ok, created_at
             FROM test_runs WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await?;

        row.as_ref().map(map_run_row).transpose()
    }

    /// Delete a run record by id. Returns whether a record was deleted.
    pub async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM test_runs WHERE id = ?1")
            .bind(id)
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Aggregate stats over all stored runs.
    pub async fn stats(&self) -> Result<RunStats, StorageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(AVG(avg_latency_ms), 0.0) AS avg_ms,
                    COALESCE(AVG(CASE WHEN ok THEN 100.0 ELSE 0.0 END), 0.0) AS rate
             FROM test_runs",
        )
        .fetch_one(self.pool.inner())
        .await?;

        Ok(RunStats {
            total_runs: row.try_get("total").map_err(StorageError::Database)?,
            avg_latency_ms: row.try_get("avg_ms").map_err(StorageError::Database)?,
            success_rate_pct: row.try_get("rate").map_err(StorageError::Database)?,
        })
    }
}

/// Map a database row to a [`TestRun`].
fn map_run_row(row: &SqliteRow) -> Result<TestRun, StorageError> {
    let status_counts_raw: String = row.try_get("status_counts")?;
    let status_counts: BTreeMap<String, u32> = serde_json::from_str(&status_counts_raw)
        .map_err(|e| StorageError::InvalidData(format!("status_counts: {e}")))?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(TestRun {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        method: row.try_get("method")?,
        avg_latency_ms: row.try_get("avg_latency_ms")?,
        min_latency_ms: row.try_get("min_latency_ms")?,
        max_latency_ms: row.try_get("max_latency_ms")?,
        status_counts,
        tips: row.try_get("tips")?,
        ok: row.try_get("ok")?,
        created_at,
    })
}
