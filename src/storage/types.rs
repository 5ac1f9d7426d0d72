//! Core data types for the storage layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::probe::{HttpMethod, ProbeSummary};

/// A persisted probe run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    /// Record identifier (UUID v4).
    pub id: String,
    /// Target URL that was probed.
    pub url: String,
    /// HTTP method used for every sample.
    pub method: String,
    /// Mean latency over the batch, failure zeros included.
    pub avg_latency_ms: f64,
    pub min_latency_ms: i64,
    pub max_latency_ms: i64,
    /// Status bucket -> occurrence count.
    pub status_counts: BTreeMap<String, u32>,
    /// Advisor tips, if enrichment was attempted.
    pub tips: Option<String>,
    /// Whether any sample observed a 2xx status.
    pub ok: bool,
    /// Record creation timestamp (UTC).
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new run record.
#[derive(Debug, Clone)]
pub struct NewTestRun {
    pub url: String,
    pub method: HttpMethod,
    pub summary: ProbeSummary,
    pub tips: Option<String>,
}

impl NewTestRun {
    /// Assign an id and timestamp, producing the record to persist.
    pub fn into_record(self) -> TestRun {
        let ok = self.summary.any_success();
        TestRun {
            id: Uuid::new_v4().to_string(),
            url: self.url,
            method: self.method.as_str().to_string(),
            avg_latency_ms: self.summary.avg_latency_ms,
            min_latency_ms: self.summary.min_latency_ms as i64,
            max_latency_ms: self.summary.max_latency_ms as i64,
            status_counts: self.summary.status_counts,
            tips: self.tips,
            ok,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(counts: &[(&str, u32)]) -> ProbeSummary {
        ProbeSummary {
            avg_latency_ms: 12.0,
            min_latency_ms: 0,
            max_latency_ms: 30,
            status_counts: counts
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    #[test]
    fn test_into_record_marks_2xx_as_ok() {
        let run = NewTestRun {
            url: "https://api.example.com/".to_string(),
            method: HttpMethod::Get,
            summary: summary(&[("200", 3), ("error", 2)]),
            tips: Some("- cache it".to_string()),
        };

        let record = run.into_record();
        assert!(record.ok);
        assert_eq!(record.method, "GET");
        assert_eq!(record.min_latency_ms, 0);
        assert_eq!(record.max_latency_ms, 30);
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_into_record_all_failures_not_ok() {
        let run = NewTestRun {
            url: "https://api.example.com/".to_string(),
            method: HttpMethod::Post,
            summary: summary(&[("error", 5)]),
            tips: None,
        };

        let record = run.into_record();
        assert!(!record.ok);
        assert!(record.tips.is_none());
    }

    #[test]
    fn test_4xx_only_is_not_ok() {
        let run = NewTestRun {
            url: "https://api.example.com/".to_string(),
            method: HttpMethod::Get,
            summary: summary(&[("404", 5)]),
            tips: None,
        };

        assert!(!run.into_record().ok);
    }
}
