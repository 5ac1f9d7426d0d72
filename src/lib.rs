//! ApiPulse - API Latency Probe Library
//!
//! This crate provides the core functionality for the ApiPulse dashboard.
//! It can be used as a library by other Rust projects, or run as a standalone
//! binary with the `apipulse` executable.
//!
//! # Architecture
//!
//! - **Probe**: fixed-count sequential latency sampling against a target URL
//! - **Advisor**: optimization-tips enrichment via a text-generation service
//! - **Storage**: SQLite persistence for run records
//! - **Server**: JSON API plus the HTMX-powered dashboard UI
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use apipulse::probe::{HttpMethod, HttpTransport, ProbeRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(HttpTransport::new(Duration::from_secs(10))?);
//!     let runner = ProbeRunner::new(transport, 20);
//!
//!     let report = runner
//!         .run("https://api.example.com/users", HttpMethod::Get, 5)
//!         .await?;
//!     println!("{:?}", report.summary());
//!
//!     Ok(())
//! }
//! ```

pub mod advisor;
pub mod config;
pub mod probe;
pub mod server;
pub mod storage;

pub use advisor::{GeminiAdvisor, TipsAdvisor};
pub use config::AppConfig;
pub use probe::{HttpMethod, HttpTransport, ProbeRunner, ProbeSummary};
pub use server::{AppState, create_router};
pub use storage::{RunStore, SqlitePool, TestRun};
