//! Storage Service
//!
//! Document upload into the protected root.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quill_core::dto::storage::{UploadRequest, UploadResponse};
use quill_core::layout::{has_document_extension, normalize_path};
use quill_storage::{StorageError, StorageGateway};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid base64 content: {0}")]
    InvalidContent(String),

    #[error("Only .pdf files can be uploaded: {0}")]
    NotADocument(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Decodes an upload and places it under the protected root
///
/// Whitespace in path segments is replaced with `_`.
pub async fn upload_document(
    storage: &dyn StorageGateway,
    req: UploadRequest,
) -> Result<UploadResponse, UploadError> {
    let content = STANDARD
        .decode(req.content_base64.trim())
        .map_err(|e| UploadError::InvalidContent(e.to_string()))?;

    let path = sanitize_upload_path(&req.path)?;
    if !has_document_extension(&path) {
        return Err(UploadError::NotADocument(req.path));
    }

    let file = storage
        .upload_to_protected_zone(&path, &content, &req.mime_type)
        .await?;

    tracing::info!(path = %file.path, size = content.len(), "Document uploaded");

    Ok(UploadResponse {
        success: true,
        file_id: file.id,
        path: file.path,
        size: file.size.unwrap_or(content.len() as u64),
    })
}

fn sanitize_upload_path(path: &str) -> Result<String, UploadError> {
    let normalized = normalize_path(path).map_err(StorageError::from)?;
    Ok(normalized
        .split('/')
        .map(sanitize_segment)
        .collect::<Vec<_>>()
        .join("/"))
}

fn sanitize_segment(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_storage::MemoryStorage;

    fn upload(path: &str, content: &[u8]) -> UploadRequest {
        UploadRequest {
            path: path.to_string(),
            content_base64: STANDARD.encode(content),
            mime_type: "application/pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_lands_in_protected_root() {
        let storage = MemoryStorage::new();
        let resp = upload_document(&storage, upload("Notes/my notes.pdf", b"%PDF-1.7"))
            .await
            .unwrap();

        assert!(resp.success);
        assert_eq!(resp.path, "raw/Notes/my_notes.pdf");
        assert_eq!(resp.size, 8);
        assert_eq!(storage.fetch("raw/Notes/my_notes.pdf").await.unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let storage = MemoryStorage::new();

        let mut bad = upload("Notes/a.pdf", b"x");
        bad.content_base64 = "%%% not base64".into();
        assert!(matches!(
            upload_document(&storage, bad).await,
            Err(UploadError::InvalidContent(_))
        ));

        assert!(matches!(
            upload_document(&storage, upload("Notes/a.docx", b"x")).await,
            Err(UploadError::NotADocument(_))
        ));
        assert!(storage.paths().await.is_empty());
    }
}
