use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    dicom::{ExtractError, TagValue, INVALID_TAG_NAME, NOT_SUPPORTED},
    error::{AppError, AppResult, FeedbackExt},
    state::AppState,
    types::{ApiMessageResponse, ApiUploadResponse, RetrieveQuery},
};

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "dicomFile";

/// Feedback for any upload that could not be received, including oversized bodies.
pub const RECEIVE_FAILED: &str = "Error receiving uploaded file, try again";
const STORE_FAILED: &str = "Error Storing uploaded file, try again";

const RETRIEVE_FAILED: &str = "Error retrieving record:";
const IMAGE_FAILED: &str = "Error retrieving image for:";
const DICOM_FAILED: &str = "Error retrieving dicom file for:";
const DELETE_FAILED: &str = "Error deleting record:";
const PARSE_FAILED: &str = "Error parsing record:";

pub async fn welcome() -> impl IntoResponse {
    (StatusCode::OK, "Welcome to the DicomStore API")
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<ApiUploadResponse>)> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("Rejected upload: {}", e);
        AppError::BadRequest(RECEIVE_FAILED.into())
    })?;

    let (file_name, data) = loop {
        let field = multipart.next_field().await.map_err(|e| {
            tracing::warn!("Failed to parse multipart data: {}", e);
            AppError::BadRequest(RECEIVE_FAILED.into())
        })?;
        let Some(field) = field else {
            tracing::warn!("Upload without {} field", UPLOAD_FIELD);
            return Err(AppError::BadRequest(RECEIVE_FAILED.into()));
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or(UPLOAD_FIELD).to_string();
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read uploaded file: {}", e);
            AppError::BadRequest(RECEIVE_FAILED.into())
        })?;
        break (file_name, data);
    };

    let id = Uuid::new_v4().to_string();
    state.store.create(&data, &id).await.or_feedback(STORE_FAILED)?;
    state.metrics.record_upload(data.len() as u64);

    Ok((
        StatusCode::CREATED,
        Json(ApiUploadResponse {
            success: true,
            feedback: format!("{} with Size of {} uploaded successfully", file_name, data.len()),
            id,
        }),
    ))
}

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let ids = state.store.list().await.or_feedback("Error listing records")?;
    Ok(Json(ids))
}

/// Returns `{tag: value}` for every name in `?tags=a,b,c`.
pub async fn retrieve(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<RetrieveQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let id = record_id(path, RETRIEVE_FAILED)?;
    let feedback = format!("{}{}", RETRIEVE_FAILED, id);
    let Query(query) = query.map_err(|e| {
        tracing::warn!("Rejected query for {}: {}", id, e);
        AppError::BadRequest(feedback.clone())
    })?;
    let path = state.store.retrieve_as_path(&id).await.or_feedback(&feedback)?;

    let tags = query.tags.unwrap_or_default();
    let values = state
        .dicom
        .with_document(path, move |doc| Ok(doc.tag_values(tags.split(','))))
        .await
        .map_err(|source| extract_failure(&id, feedback, source))?;
    state.metrics.add_tag_lookups(values.len() as u64);

    let body: Map<String, Value> = values.into_iter().map(|(name, value)| (name, tag_value_json(value))).collect();
    Ok(Json(Value::Object(body)))
}

pub async fn retrieve_image(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let id = record_id(path, IMAGE_FAILED)?;
    let feedback = format!("{}{}", IMAGE_FAILED, id);
    let path = state.store.retrieve_as_path(&id).await.or_feedback(&feedback)?;
    let png = state
        .dicom
        .with_document(path, |doc| doc.render_png())
        .await
        .map_err(|source| extract_failure(&id, feedback, source))?;
    state.metrics.inc_images_rendered();
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

pub async fn retrieve_dicom(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let id = record_id(path, DICOM_FAILED)?;
    let data = state.store.retrieve(&id).await.or_feedback(format!("{}{}", DICOM_FAILED, id))?;
    state.metrics.inc_downloaded();
    Ok(([(header::CONTENT_TYPE, "application/dicom")], data))
}

pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<ApiMessageResponse>> {
    let id = record_id(path, DELETE_FAILED)?;
    if !state.store.delete(&id).await {
        return Err(AppError::BadRequest(format!("{}{}", DELETE_FAILED, id)));
    }
    state.metrics.inc_deleted();
    Ok(Json(ApiMessageResponse { success: true, feedback: format!("Successfully deleted record:{}", id) }))
}

/// Unwraps the `{id}` segment. A segment axum cannot decode has no id to
/// report, so the feedback ends at the route's prefix.
fn record_id(path: Result<Path<String>, PathRejection>, prefix: &str) -> AppResult<String> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(e) => {
            tracing::warn!("Rejected record id: {}", e);
            Err(AppError::BadRequest(prefix.trim_end_matches(':').to_string()))
        }
    }
}

/// A stored file that is not DICOM gets its own feedback so clients can tell
/// it apart from a missing record.
fn extract_failure(id: &str, feedback: String, source: ExtractError) -> AppError {
    let feedback = match source {
        ExtractError::Parse { .. } => format!("{}{}", PARSE_FAILED, id),
        _ => feedback,
    };
    AppError::Extract { feedback, source }
}

fn tag_value_json(value: TagValue) -> Value {
    match value {
        TagValue::Text(s) | TagValue::Unknown(s) => Value::String(s),
        TagValue::Number(n) => serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
        TagValue::Integer(i) => Value::from(i),
        TagValue::Unsupported => Value::from(NOT_SUPPORTED),
        TagValue::InvalidTagName => Value::from(INVALID_TAG_NAME),
        TagValue::Absent => Value::Null,
    }
}
