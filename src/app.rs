use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::middleware;
use crate::routes;
use crate::state::AppState;

/// Builds the full service: routes plus body limit, validation, compression,
/// tracing and security headers.
pub fn build_app(state: AppState) -> Router {
    let cfg = state.config.clone();
    let body_limit = cfg.max_upload_bytes;

    let app = routes::router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn_with_state(cfg.clone(), middleware::validation::validate_request_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg, middleware::security_headers::security_headers_middleware));

    // CORS: permissive in debug builds for local tooling
    if cfg!(debug_assertions) {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
