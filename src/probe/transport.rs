//! Transport seam for probe requests.
//!
//! The runner talks to the network through [`ProbeTransport`] so tests can
//! substitute a scripted implementation without process-wide state.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

use super::runner::HttpMethod;

/// Errors from one transport round-trip.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The per-request timeout elapsed before a response arrived.
    #[error("timeout elapsed")]
    Timeout,

    /// The request failed before a response was obtained
    /// (DNS failure, connection refused, TLS error, malformed response).
    #[error("transport error: {0}")]
    Connect(String),
}

/// One measured response.
#[derive(Debug, Clone, Copy)]
pub struct ProbeResponse {
    pub status: u16,
    pub latency: Duration,
}

/// A single request/response round-trip with latency measurement.
#[async_trait]
pub trait ProbeTransport: Send + Sync + 'static {
    async fn roundtrip(
        &self,
        method: HttpMethod,
        url: &Url,
    ) -> Result<ProbeResponse, TransportError>;
}

/// Production transport backed by a reqwest [`Client`].
pub struct HttpTransport {
    client: Client,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport with the given per-request timeout.
    ///
    /// # Errors
    /// Returns `TransportError::Connect` if the HTTP client cannot be built.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            request_timeout,
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn roundtrip(
        &self,
        method: HttpMethod,
        url: &Url,
    ) -> Result<ProbeResponse, TransportError> {
        let request = self.client.request(method.into(), url.clone());

        let start = Instant::now();
        let result = timeout(self.request_timeout, request.send()).await;
        let latency = start.elapsed();

        match result {
            Ok(Ok(response)) => Ok(ProbeResponse {
                status: response.status().as_u16(),
                latency,
            }),
            Ok(Err(e)) if e.is_timeout() => Err(TransportError::Timeout),
            Ok(Err(e)) => Err(TransportError::Connect(e.to_string())),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_builds_with_timeout() {
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        assert_eq!(transport.request_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_connect_error() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        // Port 1 on localhost is essentially never listening.
        let url = Url::parse("http://127.0.0.1:1/").unwrap();

        let err = transport.roundtrip(HttpMethod::Get, &url).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
