//! Storage Layer
//!
//! SQLite persistence for probe run records via sqlx:
//!
//! - [`SqlitePool`]: Connection pool wrapper (WAL mode, create-if-missing)
//! - [`RunStore`]: CRUD facade for test run records
//! - [`TestRun`] / [`NewTestRun`]: persisted record and insert payload
//! - [`RunStats`]: aggregate figures for the dashboard cards

mod db;
mod error;
mod run_store;
mod schema;
mod types;

pub use db::SqlitePool;
pub use error::StorageError;
pub use run_store::{RunQuery, RunStats, RunStore, SortOrder};
pub use schema::init_schema;
pub use types::{NewTestRun, TestRun};
