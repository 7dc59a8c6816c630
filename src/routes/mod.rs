//! HTTP route handlers.
//!
//! - `records`: upload, list, tag lookup, rendering, download and deletion of records
//! - `health`: liveness/readiness probes, metrics and version info

pub mod health;
pub mod records;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// All routes, without middleware. See [`crate::app::build_app`] for the layered service.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(records::welcome))
        .route("/data", post(records::upload).get(records::list))
        .route("/data/{id}", get(records::retrieve).delete(records::delete))
        .route("/data/{id}/image", get(records::retrieve_image))
        .route("/data/{id}/dicom", get(records::retrieve_dicom))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
}
