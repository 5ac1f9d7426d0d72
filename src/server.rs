//! Web server module.
//!
//! JSON API for running and browsing probes, plus the HTMX-powered
//! dashboard UI.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::advisor::{FALLBACK_TIPS, RunContext, TipsAdvisor};
use crate::probe::{HttpMethod, ProbeError, ProbeRunner};
use crate::storage::{NewTestRun, RunQuery, RunStore, SortOrder, StorageError, TestRun};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<ProbeRunner>,
    /// Absent when the advisor is disabled; runs are then stored without tips.
    pub advisor: Option<Arc<dyn TipsAdvisor>>,
    pub run_store: RunStore,
    /// Samples per run when the request doesn't say.
    pub default_samples: u32,
}

/// API error mapped to a JSON `{error, status}` body.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Storage(StorageError),
}

impl From<ProbeError> for ApiError {
    fn from(err: ProbeError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Storage(err) => {
                tracing::error!(error = %err, "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    db: Option<String>,
}

/// Request body for starting a run.
#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub url: String,
    /// HTTP method name; defaults to GET.
    pub method: Option<String>,
    /// Sample count override; defaults to the configured per-run count.
    pub samples: Option<u32>,
}

/// Query parameters for the runs list API.
#[derive(Debug, Deserialize)]
pub struct RunsQueryParams {
    pub limit: Option<u32>,
    pub order: Option<String>,
}

impl RunsQueryParams {
    fn into_query(self) -> RunQuery {
        RunQuery {
            limit: self.limit,
            order: self.order.and_then(|o| o.parse::<SortOrder>().ok()),
        }
    }
}

use askama::Template;

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    default_samples: u32,
}

/// Runs table partial template.
#[derive(Template)]
#[template(path = "partials/runs.html")]
struct RunsTemplate {
    runs: Vec<RunRow>,
}

/// Pre-rendered row for the runs table partial.
struct RunRow {
    url: String,
    method: String,
    avg_latency: String,
    min_latency: String,
    max_latency: String,
    statuses: String,
    tips: String,
    ok: bool,
    created_at: String,
}

impl From<TestRun> for RunRow {
    fn from(run: TestRun) -> Self {
        let statuses = run
            .status_counts
            .iter()
            .map(|(bucket, count)| format!("{bucket} x{count}"))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            url: run.url,
            method: run.method,
            avg_latency: format!("{:.1} ms", run.avg_latency_ms),
            min_latency: format!("{} ms", run.min_latency_ms),
            max_latency: format!("{} ms", run.max_latency_ms),
            statuses,
            tips: run.tips.unwrap_or_default(),
            ok: run.ok,
            created_at: run.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Wrapper to render Askama templates as Axum responses.
struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(rendered) => Html(rendered).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "Template render failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(dashboard_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/api/runs", post(create_run_handler).get(list_runs_handler))
        .route("/api/runs/stats", get(run_stats_handler))
        .route(
            "/api/runs/{id}",
            get(get_run_handler).delete(delete_run_handler),
        )
        .route("/runs/table", get(runs_table_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Dashboard homepage handler.
async fn dashboard_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    HtmlTemplate(DashboardTemplate {
        default_samples: state.default_samples,
    })
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        db: None,
    })
}

/// Readiness probe that checks database availability.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.run_store.stats().await {
        Ok(_) => Json(HealthResponse {
            status: "ok".to_string(),
            db: Some("ready".to_string()),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "not_ready".to_string(),
                    db: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Run a probe batch, enrich with advisor tips, persist, return the record.
async fn create_run_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<TestRun>), ApiError> {
    let method = match request.method.as_deref() {
        None => HttpMethod::default(),
        Some(raw) => raw
            .parse::<HttpMethod>()
            .map_err(|_| ApiError::BadRequest(format!("unsupported HTTP method '{raw}'")))?,
    };
    let samples = request.samples.unwrap_or(state.default_samples);

    let report = state.runner.run(&request.url, method, samples).await?;
    let summary = report.summary();

    // The summary is final at this point; advisor failures only affect the
    // tips column.
    let tips = match &state.advisor {
        None => None,
        Some(advisor) => {
            let ctx = RunContext {
                target: report.target.clone(),
                method,
                summary: summary.clone(),
            };
            match advisor.suggest(&ctx).await {
                Ok(text) => Some(text),
                Err(err) => {
                    tracing::warn!(error = %err, target = %report.target, "Advisor call failed");
                    Some(FALLBACK_TIPS.to_string())
                }
            }
        }
    };

    let record = NewTestRun {
        url: report.target,
        method,
        summary,
        tips,
    }
    .into_record();

    state.run_store.insert(&record).await?;
    tracing::info!(id = %record.id, url = %record.url, samples, "Probe run completed");

    Ok((StatusCode::CREATED, Json(record)))
}

/// Runs list API endpoint - returns JSON records.
async fn list_runs_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RunsQueryParams>,
) -> Result<Json<Vec<TestRun>>, ApiError> {
    let runs = state.run_store.list(params.into_query()).await?;
    Ok(Json(runs))
}

/// Single run API endpoint.
async fn get_run_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TestRun>, ApiError> {
    match state.run_store.get(&id).await? {
        Some(run) => Ok(Json(run)),
        None => Err(ApiError::NotFound(format!("no run with id '{id}'"))),
    }
}

/// Delete a run record.
async fn delete_run_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.run_store.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no run with id '{id}'")))
    }
}

/// Run stats API endpoint - returns JSON aggregates for the dashboard cards.
async fn run_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<crate::storage::RunStats>, ApiError> {
    let stats = state.run_store.stats().await?;
    Ok(Json(stats))
}

/// Runs table endpoint - returns HTML partial for HTMX.
async fn runs_table_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RunsQueryParams>,
) -> Result<Response, ApiError> {
    let runs = state.run_store.list(params.into_query()).await?;
    let rows = runs.into_iter().map(RunRow::from).collect();
    Ok(HtmlTemplate(RunsTemplate { runs: rows }).into_response())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::probe::{ProbeSummary, ProbeTransport};
    use crate::storage::{SqlitePool, init_schema};

    /// Transport that always answers 200 with a fixed latency.
    struct FixedTransport;

    #[async_trait::async_trait]
    impl ProbeTransport for FixedTransport {
        async fn roundtrip(
            &self,
            _method: HttpMethod,
            _url: &url::Url,
        ) -> Result<crate::probe::ProbeResponse, crate::probe::TransportError> {
            Ok(crate::probe::ProbeResponse {
                status: 200,
                latency: std::time::Duration::from_millis(10),
            })
        }
    }

    async fn create_test_state() -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("server.db").display());
        let pool = SqlitePool::connect(&url).await.unwrap();
        init_schema(&pool).await.unwrap();

        let state = AppState {
            runner: Arc::new(ProbeRunner::new(Arc::new(FixedTransport), 20)),
            advisor: None,
            run_store: RunStore::new(pool),
            default_samples: 5,
        };
        (state, dir)
    }

    #[tokio::test]
    async fn test_healthz() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_run_persists_record() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/runs")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"url": "https://api.example.com/users", "method": "GET"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let run: TestRun = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(run.method, "GET");
        assert_eq!(run.avg_latency_ms, 10.0);
        assert!(run.ok);

        let mut expected = BTreeMap::new();
        expected.insert("200".to_string(), 5u32);
        assert_eq!(run.status_counts, expected);
    }

    #[tokio::test]
    async fn test_create_run_rejects_bad_method() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/runs")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"url": "https://api.example.com/", "method": "TELEPORT"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_missing_run_is_404_json() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/runs/no-such-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_runs_table_partial_renders() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/runs/table")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_run_row_rendering() {
        let mut status_counts = BTreeMap::new();
        status_counts.insert("200".to_string(), 3u32);
        status_counts.insert("error".to_string(), 2u32);

        let row = RunRow::from(TestRun {
            id: "abc".to_string(),
            url: "https://api.example.com/".to_string(),
            method: "GET".to_string(),
            avg_latency_ms: 12.0,
            min_latency_ms: 0,
            max_latency_ms: 30,
            status_counts,
            tips: None,
            ok: true,
            created_at: chrono::Utc::now(),
        });

        assert_eq!(row.avg_latency, "12.0 ms");
        assert_eq!(row.statuses, "200 x3, error x2");
        assert!(row.tips.is_empty());
    }

    #[test]
    fn test_summary_shape_used_by_rows() {
        // RunRow is built from persisted summaries; a degenerate all-failure
        // summary must still render.
        let summary = ProbeSummary {
            avg_latency_ms: 0.0,
            min_latency_ms: 0,
            max_latency_ms: 0,
            status_counts: BTreeMap::from([("error".to_string(), 5u32)]),
        };
        let row = RunRow::from(
            NewTestRun {
                url: "https://down.example.com/".to_string(),
                method: HttpMethod::Get,
                summary,
                tips: Some(FALLBACK_TIPS.to_string()),
            }
            .into_record(),
        );

        assert_eq!(row.avg_latency, "0.0 ms");
        assert!(!row.ok);
        assert_eq!(row.tips, FALLBACK_TIPS);
    }
}
