//! HTTP probe core.
//!
//! A probe run issues a fixed number of strictly sequential requests against a
//! target URL, records one [`SampleOutcome`] per request, and reduces the batch
//! into a [`ProbeSummary`] (average/min/max latency plus a status-code
//! histogram).
//!
//! # Error Handling Philosophy
//!
//! The runner distinguishes **per-sample failures** from **run errors**:
//!
//! - **Per-sample failures** (timeout, connection refused, DNS failure): valid
//!   observation results. They are recorded as `TimedOut`/`Failed` outcomes and
//!   never abort the batch: a run where every sample fails still produces a
//!   complete, well-formed summary. The summary itself is the diagnostic
//!   signal.
//! - **Run errors** (malformed URL, zero sample count): the run cannot execute
//!   at all and is rejected with [`ProbeError`] before any network activity.

mod outcome;
mod runner;
mod transport;

pub use outcome::{ProbeReport, ProbeSummary, SampleOutcome};
pub use runner::{HttpMethod, ProbeError, ProbeRunner};
pub use transport::{HttpTransport, ProbeResponse, ProbeTransport, TransportError};
