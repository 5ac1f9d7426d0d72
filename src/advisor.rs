//! Optimization tips advisor.
//!
//! After a probe run completes, its summary is handed to a text-generation
//! service which returns brief optimization tips for the tested endpoint.
//! The advisor is an explicitly constructed, injectable client. Handlers
//! receive it through [`TipsAdvisor`], so tests substitute a stub without
//! process-wide state.
//!
//! Advisor failures are recovered by the caller and must never be conflated
//! with probe failure: the probe summary is final and valid before the
//! advisor is consulted.

mod gemini;

use async_trait::async_trait;
use thiserror::Error;

use crate::probe::{HttpMethod, ProbeSummary};

pub use gemini::{GeminiAdvisor, DEFAULT_API_URL, DEFAULT_MODEL};

/// Fallback tips string persisted when the advisor call fails.
pub const FALLBACK_TIPS: &str = "Could not generate optimization tips due to an error.";

/// Errors from the tips advisor.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// HTTP request to the text-generation service failed.
    #[error("advisor request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service responded with a non-success status.
    #[error("advisor API returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// The response carried no usable text.
    #[error("advisor response contained no text")]
    EmptyResponse,
}

/// Context for one tips request: what was probed and what was measured.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub target: String,
    pub method: HttpMethod,
    pub summary: ProbeSummary,
}

impl RunContext {
    /// Render the prompt sent to the text-generation service.
    pub fn prompt(&self) -> String {
        let sample_count: u32 = self.summary.status_counts.values().sum();
        let status_counts =
            serde_json::to_string(&self.summary.status_counts).unwrap_or_else(|_| "{}".to_string());

        format!(
            "I tested {method} {target} {samples} times.\n\
             Avg latency: {avg} ms, min: {min} ms, max: {max} ms, status codes: {status_counts}.\n\n\
             Suggest brief API optimization tips as short bullet points, one line each.\n\
             Highlight the most important points. Avoid long paragraphs.\n\
             Only return the tips, no introduction or conclusion.",
            method = self.method,
            target = self.target,
            samples = sample_count,
            avg = self.summary.avg_latency_ms,
            min = self.summary.min_latency_ms,
            max = self.summary.max_latency_ms,
        )
    }
}

/// Text-generation collaborator for run enrichment.
#[async_trait]
pub trait TipsAdvisor: Send + Sync + 'static {
    /// Request optimization tips for one completed run.
    async fn suggest(&self, ctx: &RunContext) -> Result<String, AdvisorError>;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_prompt_carries_summary_fields() {
        let mut status_counts = BTreeMap::new();
        status_counts.insert("200".to_string(), 3u32);
        status_counts.insert("error".to_string(), 2u32);

        let ctx = RunContext {
            target: "https://api.example.com/users".to_string(),
            method: HttpMethod::Get,
            summary: ProbeSummary {
                avg_latency_ms: 12.0,
                min_latency_ms: 0,
                max_latency_ms: 30,
                status_counts,
            },
        };

        let prompt = ctx.prompt();
        assert!(prompt.contains("GET https://api.example.com/users 5 times"));
        assert!(prompt.contains("Avg latency: 12 ms"));
        assert!(prompt.contains("min: 0 ms"));
        assert!(prompt.contains("max: 30 ms"));
        assert!(prompt.contains(r#""200":3"#));
        assert!(prompt.contains(r#""error":2"#));
    }
}
