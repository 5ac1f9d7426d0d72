//! Database schema definitions.

use crate::storage::{SqlitePool, StorageError};

/// SQL statement for creating the test_runs table.
///
/// One row per completed probe run. `status_counts` is the histogram stored
/// as a JSON string; `ok` denormalizes "any 2xx bucket observed" so the
/// dashboard success-rate card is a plain aggregate query.
pub const TEST_RUNS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS test_runs (
    id             TEXT PRIMARY KEY,
    url            TEXT NOT NULL,
    method         TEXT NOT NULL,
    avg_latency_ms REAL NOT NULL,
    min_latency_ms INTEGER NOT NULL,
    max_latency_ms INTEGER NOT NULL,
    status_counts  TEXT NOT NULL DEFAULT '{}',
    tips           TEXT,
    ok             BOOLEAN NOT NULL DEFAULT FALSE,
    created_at     TEXT NOT NULL
);
"#;

/// Index for the list view (newest first).
pub const TEST_RUNS_CREATED_AT_INDEX_DDL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_test_runs_created_at ON test_runs (created_at DESC);
"#;

/// Initialize the database schema.
///
/// Creates all necessary tables and indexes if they don't exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query(TEST_RUNS_TABLE_DDL).execute(pool.inner()).await?;
    sqlx::query(TEST_RUNS_CREATED_AT_INDEX_DDL)
        .execute(pool.inner())
        .await?;

    tracing::info!("Database schema initialized");
    Ok(())
}
