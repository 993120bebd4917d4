// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! HTTP read API for the benchmark dashboard.
//!
//! Serves stored runs as JSON for an external presentation layer, plus
//! import, delete and export actions. Storage calls are synchronous SQLite
//! work and run on the blocking pool.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use protobench_core::export::{self, ComparisonRow};
use protobench_core::legacy::{import_into_store, ImportSummary};
use protobench_core::{
    AdapterRegistry, BenchError, BenchResult, BenchmarkRun, ExportFormat, MetricsStore, RunFilter,
    RunSummary, StoreStats,
};

use crate::error::{CliError, CliResult};
use crate::metrics;

/// Dashboard state shared across handlers
#[derive(Clone)]
pub struct DashboardState {
    pub store: Arc<MetricsStore>,
    pub registry: Arc<AdapterRegistry>,
    /// Directory scanned by `POST /api/import-legacy` when the body names none.
    pub import_dir: PathBuf,
}

/// Structured error body: `{"error": <kind>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: message.into(),
        }
    }
}

impl From<BenchError> for ApiError {
    fn from(err: BenchError) -> Self {
        let status = match &err {
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            BenchError::DuplicateRunId(_) => StatusCode::CONFLICT,
            BenchError::HardValidation(_)
            | BenchError::MalformedArtifact { .. }
            | BenchError::EmptyDataset { .. }
            | BenchError::ConfigNotFound { .. }
            | BenchError::ConfigParse { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(kind = err.kind(), error = %err, "Dashboard request failed");
        }
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.kind, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run store work off the async workers.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> BenchResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("storage task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(store_stats))
        .route("/api/runs", get(list_runs))
        .route("/api/runs/{run_id}", get(get_run).delete(delete_run))
        .route("/api/latest", get(latest))
        .route("/api/compare", get(compare))
        .route("/api/import-legacy", post(import_legacy))
        .route("/api/export/{run_id}/{format}", get(export_run))
        .route("/metrics", get(prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: DashboardState) -> CliResult<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(CliError::Server)?;
    tracing::info!("Dashboard API listening on http://{}", addr);
    println!("Dashboard API listening on http://{} (Ctrl+C to stop)", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await
        .map_err(CliError::Server)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn store_stats(State(state): State<DashboardState>) -> ApiResult<Json<StoreStats>> {
    let store = state.store.clone();
    let stats = blocking(move || store.stats()).await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
struct RunsQuery {
    protocol: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_runs(
    State(state): State<DashboardState>,
    Query(query): Query<RunsQuery>,
) -> ApiResult<Json<Vec<RunSummary>>> {
    let mut filter = RunFilter::default();
    if let Some(protocol) = query.protocol {
        filter = filter.protocol(protocol);
    }
    if let Some(limit) = query.limit {
        filter = filter.limit(limit);
    }
    if let Some(offset) = query.offset {
        filter = filter.offset(offset);
    }

    let store = state.store.clone();
    let runs = blocking(move || store.list(&filter)).await?;
    Ok(Json(runs))
}

async fn get_run(
    State(state): State<DashboardState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<BenchmarkRun>> {
    let store = state.store.clone();
    let run = blocking(move || store.get(&run_id)).await?;
    Ok(Json(run))
}

async fn delete_run(
    State(state): State<DashboardState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let store = state.store.clone();
    let id = run_id.clone();
    let samples = blocking(move || store.delete(&id)).await?;

    metrics::RUN_DELETIONS.inc();
    tracing::info!(run_id = %run_id, samples = samples, "Run deleted via dashboard");
    Ok(Json(json!({ "run_id": run_id, "deleted_samples": samples })))
}

async fn latest(
    State(state): State<DashboardState>,
) -> ApiResult<Json<BTreeMap<String, RunSummary>>> {
    let store = state.store.clone();
    let runs = blocking(move || store.latest_per_protocol()).await?;
    Ok(Json(
        runs.into_iter()
            .map(|(protocol, run)| (protocol, run.summary()))
            .collect(),
    ))
}

async fn compare(State(state): State<DashboardState>) -> ApiResult<Json<Vec<ComparisonRow>>> {
    let store = state.store.clone();
    let runs = blocking(move || store.latest_per_protocol()).await?;
    let runs: Vec<_> = runs.into_values().collect();
    Ok(Json(export::comparison(&runs)))
}

#[derive(Debug, Default, Deserialize)]
struct ImportRequest {
    dir: Option<PathBuf>,
}

async fn import_legacy(
    State(state): State<DashboardState>,
    body: Bytes,
) -> ApiResult<Json<ImportSummary>> {
    let request: ImportRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ImportRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request("invalid_request", e.to_string()))?
    };
    let dir = request.dir.unwrap_or_else(|| state.import_dir.clone());

    tracing::info!(dir = %dir.display(), "Legacy import requested");
    let store = state.store.clone();
    let registry = state.registry.clone();
    let summary = blocking(move || import_into_store(&dir, &registry, &store)).await?;

    let inserted = summary.inserted();
    metrics::record_import(
        inserted,
        summary.stored.len() - inserted,
        summary.failures.len(),
    );
    Ok(Json(summary))
}

async fn export_run(
    State(state): State<DashboardState>,
    Path((run_id, format)): Path<(String, String)>,
) -> ApiResult<Response> {
    let format: ExportFormat = format
        .parse()
        .map_err(|e: export::UnknownFormat| ApiError::bad_request("invalid_format", e.to_string()))?;

    let store = state.store.clone();
    let (name, bytes) = blocking(move || {
        let run = store.get(&run_id)?;
        let bytes = export::export_run(&run, format)?;
        Ok((run.run_id().to_string(), bytes))
    })
    .await?;

    metrics::EXPORTS
        .with_label_values(&[format.to_string().as_str()])
        .inc();

    let disposition = format!("attachment; filename=\"{}.{}\"", name, format.extension());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn prometheus_metrics(State(state): State<DashboardState>) -> Response {
    let store = state.store.clone();
    match blocking(move || store.stats()).await {
        Ok(stats) => metrics::record_store(&stats),
        Err(e) => tracing::warn!(error = %e.message, "Stored run gauge not refreshed"),
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use protobench_core::stats::ingest;
    use protobench_core::{ConfigLoader, ProtocolName, TimestampPair};
    use tower::util::ServiceExt;

    fn sample_run(protocol: &str) -> BenchmarkRun {
        let pairs = vec![
            TimestampPair::parse("2025-01-05T12:00:00.000Z", "2025-01-05T12:00:00.002Z").unwrap(),
            TimestampPair::parse("2025-01-05T12:00:01.000Z", "2025-01-05T12:00:01.004Z").unwrap(),
        ];
        ingest(pairs, &ProtocolName::new(protocol).unwrap(), None).unwrap()
    }

    fn state(import_dir: PathBuf) -> DashboardState {
        let config = ConfigLoader::builtin().unwrap();
        DashboardState {
            store: Arc::new(MetricsStore::in_memory().unwrap()),
            registry: Arc::new(
                AdapterRegistry::from_config(&config).expect("built-in adapters register"),
            ),
            import_dir,
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(app, Method::GET, uri, Body::empty()).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(state(PathBuf::from(".")));
        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_runs_listing_and_fetch() {
        let state = state(PathBuf::from("."));
        let run = sample_run("REST");
        state.store.save(&run).unwrap();
        state.store.save(&sample_run("gRPC")).unwrap();
        let app = router(state);

        let (status, body) = get_json(&app, "/api/runs?protocol=rest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["run_id"], run.run_id().as_str());

        let (status, body) = get_json(&app, "/api/runs?limit=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let uri = format!("/api/runs/{}", run.run_id());
        let (status, body) = get_json(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["samples"].as_array().unwrap().len(), 2);

        let (_, stats) = get_json(&app, "/api/stats").await;
        assert_eq!(stats["total_runs"], 2);
        assert_eq!(stats["total_samples"], 4);

        let (_, latest) = get_json(&app, "/api/latest").await;
        assert!(latest.get("REST").is_some());

        let (_, compare) = get_json(&app, "/api/compare").await;
        assert_eq!(compare.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_run_is_404_with_error_body() {
        let app = router(state(PathBuf::from(".")));
        let (status, body) = get_json(&app, "/api/runs/nope_20250101_000000_000000").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert!(body["message"].as_str().unwrap().contains("nope_20250101_000000_000000"));
    }

    #[tokio::test]
    async fn test_delete_then_fetch() {
        let state = state(PathBuf::from("."));
        let run = sample_run("CBOR");
        state.store.save(&run).unwrap();
        let app = router(state);
        let uri = format!("/api/runs/{}", run.run_id());

        let (status, body) = send(&app, Method::DELETE, &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["deleted_samples"], 2);

        let (status, _) = get_json(&app, &uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_sets_headers() {
        let state = state(PathBuf::from("."));
        let run = sample_run("AVRO");
        state.store.save(&run).unwrap();
        let app = router(state);

        let request = Request::builder()
            .uri(format!("/api/export/{}/csv", run.run_id()))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains(&format!("{}.csv", run.run_id())));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.starts_with(b"request_id,"));

        let uri = format!("/api/export/{}/pdf", run.run_id());
        let (status, body) = send(&app, Method::GET, &uri, Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "invalid_format");
    }

    #[tokio::test]
    async fn test_import_legacy_from_body_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rest_out.txt"),
            r#"[{"request_timestamp":"2025-01-05T12:00:00.000Z","response_timestamp":"2025-01-05T12:00:00.005Z"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("grpc_out.txt"), "garbage").unwrap();

        let app = router(state(PathBuf::from("/nonexistent")));
        let body = json!({ "dir": dir.path() }).to_string();
        let (status, body) = send(&app, Method::POST, "/api/import-legacy", Body::from(body)).await;
        assert_eq!(status, StatusCode::OK);

        let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary["stored"].as_array().unwrap().len(), 1);
        assert_eq!(summary["stored"][0]["outcome"], "inserted");
        assert_eq!(summary["failures"][0]["kind"], "malformed_artifact");

        let (status, body) = send(&app, Method::POST, "/api/import-legacy", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = router(state(PathBuf::from(".")));
        let (status, body) = send(&app, Method::GET, "/metrics", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("protobench_run_deletions_total"));
    }
}
