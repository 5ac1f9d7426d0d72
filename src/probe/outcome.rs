//! Sample outcomes and batch summaries.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::runner::HttpMethod;

/// Histogram bucket label for samples that failed before a response arrived.
pub const ERROR_BUCKET: &str = "error";

/// Result of one probe sample.
///
/// This is the primary representation: a failed sample is carried as an
/// explicit variant, not as a zero-latency sentinel. The flat legacy view
/// (latency `0` + `"error"` bucket) exists only as the [`ProbeSummary`]
/// projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// A response was received within the timeout.
    Success { latency: Duration, status: u16 },
    /// The per-request timeout elapsed before a response arrived.
    TimedOut,
    /// The transport failed (connection refused, DNS failure, TLS error, ...).
    Failed { reason: String },
}

impl SampleOutcome {
    /// Projected latency in whole milliseconds; `0` for failed samples.
    pub fn latency_ms(&self) -> u64 {
        match self {
            Self::Success { latency, .. } => latency.as_millis() as u64,
            Self::TimedOut | Self::Failed { .. } => 0,
        }
    }

    /// Projected histogram bucket: the stringified status code, or `"error"`.
    pub fn bucket(&self) -> String {
        match self {
            Self::Success { status, .. } => status.to_string(),
            Self::TimedOut | Self::Failed { .. } => ERROR_BUCKET.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One completed probe run: the target, the method, and exactly one outcome
/// per sample, in dispatch order.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub target: String,
    pub method: HttpMethod,
    pub outcomes: Vec<SampleOutcome>,
}

impl ProbeReport {
    /// Number of samples in the batch.
    pub fn sample_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Reduce the batch into summary statistics.
    ///
    /// Every outcome contributes exactly one latency entry (failures as `0`)
    /// and one histogram increment, so the histogram counts always sum to the
    /// sample count. The average includes the failure zeros; that conflation
    /// is the documented legacy projection, preserved deliberately.
    ///
    /// A report with no outcomes yields an all-zero summary with an empty
    /// histogram, never NaN.
    pub fn summary(&self) -> ProbeSummary {
        if self.outcomes.is_empty() {
            return ProbeSummary {
                avg_latency_ms: 0.0,
                min_latency_ms: 0,
                max_latency_ms: 0,
                status_counts: BTreeMap::new(),
            };
        }

        let latencies: Vec<u64> = self.outcomes.iter().map(SampleOutcome::latency_ms).collect();

        let mut status_counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *status_counts.entry(outcome.bucket()).or_insert(0u32) += 1;
        }

        let sum: u64 = latencies.iter().sum();
        let avg_latency_ms = sum as f64 / latencies.len() as f64;
        let min_latency_ms = latencies.iter().copied().min().unwrap_or(0);
        let max_latency_ms = latencies.iter().copied().max().unwrap_or(0);

        ProbeSummary {
            avg_latency_ms,
            min_latency_ms,
            max_latency_ms,
            status_counts,
        }
    }
}

/// Aggregated statistics over one probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    /// Arithmetic mean over all projected latencies, failure zeros included.
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    /// Bucket label -> occurrence count. Keys present only if observed.
    pub status_counts: BTreeMap<String, u32>,
}

impl ProbeSummary {
    /// Whether any sample observed a 2xx status.
    pub fn any_success(&self) -> bool {
        self.status_counts.keys().any(|code| code.starts_with('2'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(ms: u64, status: u16) -> SampleOutcome {
        SampleOutcome::Success {
            latency: Duration::from_millis(ms),
            status,
        }
    }

    fn report(outcomes: Vec<SampleOutcome>) -> ProbeReport {
        ProbeReport {
            target: "https://api.example.com/health".to_string(),
            method: HttpMethod::Get,
            outcomes,
        }
    }

    #[test]
    fn test_mixed_batch_summary() {
        // 3 successes [10, 20, 30] and 2 errors: avg = 60/5 = 12
        let report = report(vec![
            success(10, 200),
            success(20, 200),
            SampleOutcome::TimedOut,
            success(30, 200),
            SampleOutcome::Failed {
                reason: "connection refused".to_string(),
            },
        ]);

        let summary = report.summary();
        assert_eq!(summary.avg_latency_ms, 12.0);
        assert_eq!(summary.min_latency_ms, 0);
        assert_eq!(summary.max_latency_ms, 30);
        assert_eq!(summary.status_counts.get("200"), Some(&3));
        assert_eq!(summary.status_counts.get(ERROR_BUCKET), Some(&2));
    }

    #[test]
    fn test_all_failure_batch_summary() {
        let report = report(vec![SampleOutcome::TimedOut; 5]);

        let summary = report.summary();
        assert_eq!(summary.avg_latency_ms, 0.0);
        assert_eq!(summary.min_latency_ms, 0);
        assert_eq!(summary.max_latency_ms, 0);
        assert_eq!(summary.status_counts.len(), 1);
        assert_eq!(summary.status_counts.get(ERROR_BUCKET), Some(&5));
        assert!(!summary.any_success());
    }

    #[test]
    fn test_all_success_batch_has_no_error_bucket() {
        let report = report(vec![success(5, 200), success(7, 204), success(9, 200)]);

        let summary = report.summary();
        assert!(!summary.status_counts.contains_key(ERROR_BUCKET));
        assert_eq!(summary.status_counts.get("200"), Some(&2));
        assert_eq!(summary.status_counts.get("204"), Some(&1));
        assert!(summary.min_latency_ms > 0);
        assert!(summary.any_success());
    }

    #[test]
    fn test_histogram_counts_sum_to_sample_count() {
        let report = report(vec![
            success(1, 200),
            success(2, 404),
            SampleOutcome::Failed {
                reason: "dns".to_string(),
            },
            success(3, 500),
        ]);

        let summary = report.summary();
        let total: u32 = summary.status_counts.values().sum();
        assert_eq!(total as usize, report.sample_count());
    }

    #[test]
    fn test_empty_report_summary_is_all_zero() {
        let summary = report(vec![]).summary();
        assert_eq!(summary.avg_latency_ms, 0.0);
        assert!(!summary.avg_latency_ms.is_nan());
        assert_eq!(summary.min_latency_ms, 0);
        assert_eq!(summary.max_latency_ms, 0);
        assert!(summary.status_counts.is_empty());
    }

    #[test]
    fn test_min_avg_max_ordering() {
        let report = report(vec![success(10, 200), success(90, 200)]);
        let summary = report.summary();
        assert!(summary.min_latency_ms as f64 <= summary.avg_latency_ms);
        assert!(summary.avg_latency_ms <= summary.max_latency_ms as f64);
    }

    #[test]
    fn test_failure_projects_to_zero_latency_and_error_bucket() {
        let outcome = SampleOutcome::Failed {
            reason: "tls handshake".to_string(),
        };
        assert_eq!(outcome.latency_ms(), 0);
        assert_eq!(outcome.bucket(), ERROR_BUCKET);
        assert!(!outcome.is_success());
    }
}
