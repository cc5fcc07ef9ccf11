//! Storage DTOs: document uploads

use serde::{Deserialize, Serialize};

/// Document upload into the protected input root
///
/// `path` is relative to the protected root (`Notes/week1.pdf`); a path
/// that already starts with the root is accepted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub path: String,
    /// Base64-encoded document bytes
    pub content_base64: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "application/pdf".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub path: String,
    pub size: u64,
}
