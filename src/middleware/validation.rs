use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::AppConfig;
use crate::routes::records::RECEIVE_FAILED;
use crate::types::ApiMessageResponse;

/// Rejects requests before they reach a handler.
///
/// This middleware checks for:
/// - Path traversal attempts in the request URI.
/// - Upload bodies announcing more than `max_upload_bytes`.
///
/// Rejections are `400 Bad Request` with the same `{success: false, feedback}`
/// envelope as the handlers.
pub async fn validate_request_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let uri_path = req.uri().path();
    if contains_path_traversal(uri_path) {
        tracing::warn!("Path traversal rejected: {}", sanitize_for_logging(uri_path));
        return reject("Path traversal detected in request");
    }

    // Early rejection; DefaultBodyLimit still guards chunked bodies
    if matches!(req.method(), &Method::POST | &Method::PUT) {
        let announced = req
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if let Some(length) = announced {
            if length > cfg.max_upload_bytes {
                tracing::warn!("Upload of {} bytes exceeds limit of {}", length, cfg.max_upload_bytes);
                return reject(RECEIVE_FAILED);
            }
        }
    }

    next.run(req).await
}

fn reject(feedback: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiMessageResponse { success: false, feedback: feedback.to_string() }))
        .into_response()
}

/// Check if a path contains traversal attempts, including encoded variants.
fn contains_path_traversal(path: &str) -> bool {
    let lower = path.to_lowercase();

    if path.contains("/..") || path.contains("\\..") || path.starts_with("..") {
        return true;
    }
    if path.contains("/./") || path.contains("\\.\\") {
        return true;
    }
    // Multiple dots (bypass attempt: ....)
    if path.contains("....") {
        return true;
    }

    // URL-encoded variants (single and double encoding)
    let encoded_patterns = [
        "%2e%2e",
        "%252e%252e",
        "%2e/",
        "%252e%2f",
        "/%2e",
        "%2f%2e",
        "%2e\\",
        "%2e%5c",
        "%5c%2e",
        "%5c%5c",
        "%2f",
        "%00",
    ];
    if encoded_patterns.iter().any(|p| lower.contains(p)) {
        return true;
    }

    path.contains('\0')
}

/// Sanitizes user input for logging: drops control characters, caps the
/// length at 200 characters and escapes quotes.
fn sanitize_for_logging(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .take(200)
        .collect::<String>()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "\\\'")
}
