use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::error::Error;
use std::fmt;

use crate::dicom::ExtractError;
use crate::storage::StorageError;
use crate::types::ApiMessageResponse;

/// The primary error type for request handlers.
///
/// Every variant carries the human-readable `feedback` returned to the client.
/// Clients always receive `400 Bad Request` with a `{success: false, feedback}`
/// envelope; the underlying cause is only logged.
#[derive(Debug)]
pub enum AppError {
    /// For client errors that have no deeper cause.
    BadRequest(String),
    /// For failures reported by the record store.
    Storage {
        feedback: String,
        source: StorageError,
    },
    /// For failures while parsing or rendering a record.
    Extract {
        feedback: String,
        source: ExtractError,
    },
}

impl AppError {
    pub fn feedback(&self) -> &str {
        match self {
            AppError::BadRequest(feedback)
            | AppError::Storage { feedback, .. }
            | AppError::Extract { feedback, .. } => feedback,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Storage { feedback, source } => write!(f, "{} ({})", feedback, source),
            AppError::Extract { feedback, source } => write!(f, "{} ({})", feedback, source),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::BadRequest(_) => None,
            AppError::Storage { source, .. } => Some(source),
            AppError::Extract { source, .. } => Some(source),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::BadRequest(msg) => tracing::debug!("Bad request: {}", msg),
            AppError::Storage { source: StorageError::NotFound(_) | StorageError::InvalidId(_), .. } => {
                tracing::warn!("{}", self)
            }
            AppError::Storage { .. } => tracing::error!("{}", self),
            AppError::Extract { source: ExtractError::Worker(_), .. } => tracing::error!("{}", self),
            AppError::Extract { .. } => tracing::warn!("{}", self),
        }

        let body = ApiMessageResponse { success: false, feedback: self.feedback().to_string() };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// A type alias for `Result<T, AppError>`, used by all handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Attaches client-facing feedback to a storage error.
pub trait FeedbackExt<T> {
    fn or_feedback(self, feedback: impl Into<String>) -> AppResult<T>;
}

impl<T> FeedbackExt<T> for Result<T, StorageError> {
    fn or_feedback(self, feedback: impl Into<String>) -> AppResult<T> {
        self.map_err(|source| AppError::Storage { feedback: feedback.into(), source })
    }
}
