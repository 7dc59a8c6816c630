use serde::{Deserialize, Serialize};

/// Generic `{success, feedback}` envelope used for confirmations and errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessageResponse {
    pub success: bool,
    pub feedback: String,
}

/// Envelope returned after a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUploadResponse {
    pub success: bool,
    pub feedback: String,
    pub id: String,
}

/// Query string of `GET /data/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrieveQuery {
    /// Comma-separated tag keywords.
    pub tags: Option<String>,
}
