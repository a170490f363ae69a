use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::archive::{self, ArchiveCounts, DiskSpace};
use crate::config::Config;
use crate::selection::{ManualMetadata, SelectionWriter};
use crate::service;
use crate::status::{LiveStatus, StatusAggregator};

/// Start the REST API server
pub async fn start_server(
    config: Config,
    host: String,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = ApiState::new(config);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("isowatch API server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state accessible to all API handlers.
///
/// Everything in here is read-only after construction; the aggregator
/// re-reads the backing files on each request, so no locking is needed.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub aggregator: Arc<StatusAggregator>,
    pub selection: Arc<SelectionWriter>,
}

impl ApiState {
    pub fn new(config: Config) -> Self {
        let aggregator = StatusAggregator::new(&config.api_dir);
        let selection = SelectionWriter::new(&config.api_dir);
        ApiState {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
            selection: Arc::new(selection),
        }
    }
}

/// Full dashboard snapshot returned by `/api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub version: String,
    pub service_running: bool,
    pub status_text: String,
    pub output_dir: String,
    pub disk_space: DiskSpace,
    pub iso_count: usize,
    pub archive_counts: ArchiveCounts,
    pub live_status: LiveStatus,
    pub timestamp: String,
}

/// Response for API errors
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

/// Services that may be restarted over HTTP.
const RESTARTABLE_SERVICES: &[&str] = &["disk2iso", "isowatch"];

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(get_status))
        .route("/api/live_status", get(get_live_status))
        .route("/api/history", get(get_history))
        .route("/api/service/status/:service", get(get_service_status))
        .route("/api/service/restart/:service", post(restart_service))
        .route("/api/musicbrainz/releases", get(musicbrainz_releases))
        .route("/api/musicbrainz/select", post(musicbrainz_select))
        .route("/api/musicbrainz/manual", post(musicbrainz_manual))
        .route("/api/tmdb/results", get(tmdb_results))
        .route("/api/tmdb/select", post(tmdb_select))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Merged live status of the current copy operation
async fn get_live_status(State(state): State<ApiState>) -> Json<LiveStatus> {
    Json(state.aggregator.live_status())
}

/// Full dashboard snapshot (polled by the browser)
async fn get_status(State(state): State<ApiState>) -> Json<StatusSnapshot> {
    let live_status = state.aggregator.live_status();
    let service_running = service::service_running(&state.config.service_name);
    let status_text = state
        .aggregator
        .status_text(&live_status, service_running)
        .to_string();

    let output_dir = &state.config.output_dir;
    let archive_counts = archive::scan_archive(output_dir).counts();

    Json(StatusSnapshot {
        version: env!("CARGO_PKG_VERSION").to_string(),
        service_running,
        status_text,
        output_dir: output_dir.to_string_lossy().to_string(),
        disk_space: archive::disk_space(output_dir),
        iso_count: archive::count_iso_files(output_dir),
        archive_counts,
        live_status,
        timestamp: Local::now().to_rfc3339(),
    })
}

/// Activity history relayed from the service
async fn get_history(State(state): State<ApiState>) -> Json<Vec<serde_json::Value>> {
    Json(state.aggregator.history())
}

/// systemd state of one of the known services
async fn get_service_status(
    State(state): State<ApiState>,
    Path(service_name): Path<String>,
) -> Json<serde_json::Value> {
    let status = service::service_status(&service_name);
    Json(serde_json::json!({
        "success": true,
        "service": service_name,
        "status": status.status,
        "running": status.running,
        "timestamp": Local::now().to_rfc3339(),
    }))
}

/// Restart one of the known services
async fn restart_service(
    State(_state): State<ApiState>,
    Path(service_name): Path<String>,
) -> Result<Json<serde_json::Value>, Response> {
    if !RESTARTABLE_SERVICES.contains(&service_name.as_str()) {
        return Err(bad_request("Invalid service name"));
    }

    match service::restart_service(&service_name) {
        Ok(()) => Ok(Json(serde_json::json!({
            "success": true,
            "message": format!("Service {} restarted", service_name),
            "timestamp": Local::now().to_rfc3339(),
        }))),
        Err(e) => Err(ErrorResponse {
            error: format!("Failed to restart {}: {}", service_name, e),
        }
        .into_response()),
    }
}

/// MusicBrainz release candidates plus the current selection state
async fn musicbrainz_releases(
    State(state): State<ApiState>,
) -> Result<Json<serde_json::Value>, Response> {
    let Some(releases) = state.selection.musicbrainz_releases() else {
        return Err(not_found("No release candidates available"));
    };
    let selection = state.aggregator.selection_state().unwrap_or_default();

    Ok(Json(serde_json::json!({
        "status": if selection.status.is_empty() { "unknown".to_string() } else { selection.status },
        "releases": releases.releases,
        "disc_id": releases.disc_id,
        "track_count": releases.track_count,
        "selected_index": selection.selected_index,
        "confidence": if selection.confidence.is_empty() { "unknown".to_string() } else { selection.confidence },
        "message": selection.message,
    })))
}

/// Request body for selection endpoints
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub index: i64,
}

/// Confirm a MusicBrainz release choice
async fn musicbrainz_select(
    State(state): State<ApiState>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<serde_json::Value>, ErrorResponse> {
    match state.selection.select_release(request.index) {
        Ok(()) => Ok(Json(serde_json::json!({
            "success": true,
            "selected_index": request.index,
        }))),
        Err(e) => Err(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

/// Record manually-entered album metadata
async fn musicbrainz_manual(
    State(state): State<ApiState>,
    Json(metadata): Json<ManualMetadata>,
) -> Result<Json<serde_json::Value>, ErrorResponse> {
    match state.selection.manual_metadata(&metadata) {
        Ok(()) => Ok(Json(serde_json::json!({ "success": true }))),
        Err(e) => Err(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

/// TMDB search results for the inserted video disc
async fn tmdb_results(State(state): State<ApiState>) -> Result<Json<serde_json::Value>, Response> {
    let Some(results) = state.selection.tmdb_results() else {
        return Err(not_found("No TMDB results available"));
    };

    Ok(Json(serde_json::json!({
        "status": "pending",
        "results": results.results,
        "total_results": results.total_results,
    })))
}

/// Confirm a TMDB movie choice
async fn tmdb_select(
    State(state): State<ApiState>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<serde_json::Value>, ErrorResponse> {
    match state.selection.select_movie(request.index) {
        Ok(()) => Ok(Json(serde_json::json!({
            "success": true,
            "selected_index": request.index,
        }))),
        Err(e) => Err(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "success": false, "message": message })),
    )
        .into_response()
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "status": "no_data", "message": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.0["status"], "ok");
        assert!(response.0.get("version").is_some());
    }

    #[test]
    fn test_restartable_allow_list() {
        assert!(RESTARTABLE_SERVICES.contains(&"disk2iso"));
        assert!(!RESTARTABLE_SERVICES.contains(&"sshd"));
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            error: "test".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("test"));
    }

    #[tokio::test]
    async fn test_state_shares_api_dir() {
        let config = Config::default();
        let state = ApiState::new(config.clone());
        assert_eq!(state.aggregator.api_dir(), config.api_dir.as_path());
    }
}
