use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use isowatch::api::{create_router, ApiState};
use isowatch::config::Config;
use std::fs;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Helper to create test API state backed by temp directories
fn create_test_state(api_dir: &TempDir, output_dir: &TempDir) -> ApiState {
    let config = Config {
        api_dir: api_dir.path().to_path_buf(),
        output_dir: output_dir.path().to_path_buf(),
        ..Default::default()
    };
    ApiState::new(config)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let app = create_router(create_test_state(&api_dir, &output_dir));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn test_live_status_with_no_backing_files() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let app = create_router(create_test_state(&api_dir, &output_dir));

    let response = app.oneshot(get("/api/live_status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "idle");
    assert_eq!(json["progress_percent"], 0);
    assert_eq!(json["total_mb"], 0);
}

#[tokio::test]
async fn test_live_status_merges_documents() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    fs::write(
        api_dir.path().join("status.json"),
        r#"{"status": "copying", "timestamp": "2025-01-10T12:00:00"}"#,
    )
    .unwrap();
    fs::write(
        api_dir.path().join("attributes.json"),
        r#"{"disc_label": "HOLIDAY_2024", "disc_type": "dvd-video", "method": "ddrescue"}"#,
    )
    .unwrap();
    fs::write(
        api_dir.path().join("progress.json"),
        r#"{"percent": 42, "copied_mb": 4200, "total_mb": 10000, "eta": "00:08:00"}"#,
    )
    .unwrap();

    let app = create_router(create_test_state(&api_dir, &output_dir));
    let response = app.oneshot(get("/api/live_status")).await.unwrap();
    let json = body_json(response).await;

    assert_eq!(json["status"], "copying");
    assert_eq!(json["disc_label"], "HOLIDAY_2024");
    assert_eq!(json["progress_percent"], 42);
    assert_eq!(json["progress_mb"], 4200);
    assert_eq!(json["total_mb"], 10000);
}

#[tokio::test]
async fn test_full_status_snapshot_shape() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    fs::create_dir_all(output_dir.path().join("dvd")).unwrap();
    fs::write(output_dir.path().join("dvd/movie.iso"), b"iso").unwrap();

    let app = create_router(create_test_state(&api_dir, &output_dir));
    let response = app.oneshot(get("/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json.get("version").is_some());
    assert!(json.get("service_running").is_some());
    assert!(json.get("status_text").is_some());
    assert!(json.get("disk_space").is_some());
    assert_eq!(json["iso_count"], 1);
    assert_eq!(json["archive_counts"]["dvd"], 1);
    assert_eq!(json["live_status"]["status"], "idle");
}

#[tokio::test]
async fn test_history_defaults_to_empty() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let app = create_router(create_test_state(&api_dir, &output_dir));

    let response = app.oneshot(get("/api/history")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_musicbrainz_releases_missing_is_404() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let app = create_router(create_test_state(&api_dir, &output_dir));

    let response = app.oneshot(get("/api/musicbrainz/releases")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_musicbrainz_releases_with_pending_selection() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    fs::write(
        api_dir.path().join("musicbrainz_releases.json"),
        r#"{"releases": [{"title": "First"}, {"title": "Second"}], "disc_id": "abc123", "track_count": 14}"#,
    )
    .unwrap();
    fs::write(
        api_dir.path().join("musicbrainz_selection.json"),
        r#"{"status": "waiting_user_input", "selected_index": 0, "confidence": "low"}"#,
    )
    .unwrap();

    let app = create_router(create_test_state(&api_dir, &output_dir));
    let response = app.oneshot(get("/api/musicbrainz/releases")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "waiting_user_input");
    assert_eq!(json["releases"].as_array().unwrap().len(), 2);
    assert_eq!(json["disc_id"], "abc123");
    assert_eq!(json["track_count"], 14);
    assert_eq!(json["confidence"], "low");
}

#[tokio::test]
async fn test_musicbrainz_select_writes_response_file() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let app = create_router(create_test_state(&api_dir, &output_dir));

    let response = app
        .oneshot(post_json("/api/musicbrainz/select", r#"{"index": 2}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["selected_index"], 2);

    let written =
        fs::read_to_string(api_dir.path().join("musicbrainz_selection.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(doc["status"], "confirmed");
    assert_eq!(doc["selected_index"], 2);
    assert_eq!(doc["confidence"], "user_confirmed");
}

#[tokio::test]
async fn test_musicbrainz_manual_entry() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let app = create_router(create_test_state(&api_dir, &output_dir));

    let response = app
        .oneshot(post_json(
            "/api/musicbrainz/manual",
            r#"{"artist": "The Testers", "album": "Live", "year": "2001"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let written = fs::read_to_string(api_dir.path().join("musicbrainz_manual.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(doc["status"], "manual");
    assert_eq!(doc["artist"], "The Testers");
}

#[tokio::test]
async fn test_tmdb_results_and_select() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    fs::write(
        api_dir.path().join("tmdb_results.json"),
        r#"{"results": [{"title": "Some Movie"}], "total_results": 1}"#,
    )
    .unwrap();

    let state = create_test_state(&api_dir, &output_dir);
    let response = create_router(state.clone())
        .oneshot(get("/api/tmdb/results"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["total_results"], 1);

    let response = create_router(state)
        .oneshot(post_json("/api/tmdb/select", r#"{"index": 0}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(api_dir.path().join("tmdb_selection.json").exists());
}

#[tokio::test]
async fn test_restart_rejects_unknown_service() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let app = create_router(create_test_state(&api_dir, &output_dir));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/service/restart/sshd")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_service_status_endpoint_shape() {
    let api_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let app = create_router(create_test_state(&api_dir, &output_dir));

    let response = app
        .oneshot(get("/api/service/status/isowatch-test-no-such-unit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["service"], "isowatch-test-no-such-unit");
    assert_eq!(json["running"], false);
}
