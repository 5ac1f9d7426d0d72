//! Probe runner: fixed-count sequential sampling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::outcome::{ProbeReport, SampleOutcome};
use super::transport::{ProbeTransport, TransportError};

/// Errors that reject a run before any network activity.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Target is not a well-formed absolute http(s) URL.
    #[error("invalid target URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Sample count outside the accepted range.
    #[error("invalid sample count {given}: must be between 1 and {max}")]
    InvalidSampleCount { given: u32, max: u32 },
}

/// HTTP method for probe requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Head,
    Put,
    Delete,
    Options,
    Patch,
}

impl std::str::FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "HEAD" => Ok(Self::Head),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "PATCH" => Ok(Self::Patch),
            _ => Err(()),
        }
    }
}

impl HttpMethod {
    /// Get the method name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-count sequential probe runner.
///
/// Holds the transport seam and the upper bound on per-run sample counts.
/// Each invocation is independent; concurrent invocations share no mutable
/// state.
pub struct ProbeRunner {
    transport: Arc<dyn ProbeTransport>,
    max_samples: u32,
}

impl ProbeRunner {
    pub fn new(transport: Arc<dyn ProbeTransport>, max_samples: u32) -> Self {
        Self {
            transport,
            max_samples,
        }
    }

    /// Validate the target URL: must be absolute with an http(s) scheme.
    fn parse_target(target: &str) -> Result<Url, ProbeError> {
        let url = Url::parse(target).map_err(|e| ProbeError::InvalidUrl {
            url: target.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ProbeError::InvalidUrl {
                url: target.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    /// Execute one probe run: exactly `samples` sequential requests.
    ///
    /// Inputs are validated before any request is dispatched. Per-sample
    /// transport failures are recorded as outcomes and never abort the batch;
    /// the returned report always holds exactly `samples` entries.
    pub async fn run(
        &self,
        target: &str,
        method: HttpMethod,
        samples: u32,
    ) -> Result<ProbeReport, ProbeError> {
        if samples == 0 || samples > self.max_samples {
            return Err(ProbeError::InvalidSampleCount {
                given: samples,
                max: self.max_samples,
            });
        }
        let url = Self::parse_target(target)?;

        let mut outcomes = Vec::with_capacity(samples as usize);

        // Strictly sequential: each sample is awaited to completion before
        // the next is dispatched.
        for sample in 1..=samples {
            let outcome = match self.transport.roundtrip(method, &url).await {
                Ok(response) => {
                    tracing::debug!(
                        target = %url,
                        method = %method,
                        sample,
                        latency_ms = response.latency.as_millis() as u64,
                        status = response.status,
                        "Probe sample completed"
                    );
                    SampleOutcome::Success {
                        latency: response.latency,
                        status: response.status,
                    }
                }
                Err(TransportError::Timeout) => {
                    tracing::warn!(target = %url, method = %method, sample, "Probe sample timed out");
                    SampleOutcome::TimedOut
                }
                Err(TransportError::Connect(reason)) => {
                    tracing::warn!(
                        target = %url,
                        method = %method,
                        sample,
                        error = %reason,
                        "Probe sample failed"
                    );
                    SampleOutcome::Failed { reason }
                }
            };
            outcomes.push(outcome);
        }

        Ok(ProbeReport {
            target: url.to_string(),
            method,
            outcomes,
        })
    }
}

impl std::fmt::Debug for ProbeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRunner")
            .field("max_samples", &self.max_samples)
            .finish_non_exhaustive()
    }
}
