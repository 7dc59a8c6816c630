use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Health check endpoint - lightweight
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: storage directory must be reachable
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let probe = state.store.is_ready();
    match tokio::time::timeout(std::time::Duration::from_secs(5), probe).await {
        Ok(true) => (StatusCode::OK, "ready").into_response(),
        Ok(false) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: storage directory unavailable").into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

// Metrics endpoint: returns JSON snapshot
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.get_snapshot())
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let body = format!(
        "# HELP dicomstore_records_uploaded Records uploaded\n# TYPE dicomstore_records_uploaded counter\ndicomstore_records_uploaded {}\n\
# HELP dicomstore_records_deleted Records deleted\n# TYPE dicomstore_records_deleted counter\ndicomstore_records_deleted {}\n\
# HELP dicomstore_bytes_uploaded Bytes uploaded\n# TYPE dicomstore_bytes_uploaded counter\ndicomstore_bytes_uploaded {}\n\
# HELP dicomstore_tag_lookups Tag values looked up\n# TYPE dicomstore_tag_lookups counter\ndicomstore_tag_lookups {}\n\
# HELP dicomstore_images_rendered Frames rendered to PNG\n# TYPE dicomstore_images_rendered counter\ndicomstore_images_rendered {}\n\
# HELP dicomstore_files_downloaded Raw files downloaded\n# TYPE dicomstore_files_downloaded counter\ndicomstore_files_downloaded {}\n\
# HELP dicomstore_uptime_seconds Uptime seconds\n# TYPE dicomstore_uptime_seconds gauge\ndicomstore_uptime_seconds {}\n",
        m.records_uploaded,
        m.records_deleted,
        m.bytes_uploaded,
        m.tag_lookups,
        m.images_rendered,
        m.files_downloaded,
        m.uptime_seconds,
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
