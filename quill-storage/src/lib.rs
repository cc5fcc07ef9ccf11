//! Quill Storage
//!
//! Storage gateway over a hierarchical path namespace.
//!
//! Every backend enforces the same rule: nothing but
//! [`StorageGateway::upload_to_protected_zone`] may write or delete below the
//! protected input root. Source documents can therefore never be overwritten
//! by a pipeline, whatever it does.
//!
//! Backends:
//! - [`LocalStorage`]: files below a root directory
//! - [`MemoryStorage`]: in-process map, used in tests and demos

pub mod error;
pub mod local;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use quill_core::domain::storage::StorageFile;
use quill_core::layout::{StorageLayout, normalize_path};

pub use error::StorageError;
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Uniform read/write/list interface over the storage namespace
///
/// Identifiers are backend-specific. Both shipped backends use the
/// normalized path as the identifier.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Backend name, reported by health checks
    fn backend(&self) -> &'static str;

    /// Addressing scheme this backend protects
    fn layout(&self) -> &StorageLayout;

    /// Reads an object by path
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Reads an object by identifier
    async fn fetch_by_id(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    /// Lists every object below `prefix`, recursively
    ///
    /// A prefix with no objects yields an empty list. A prefix that cannot be
    /// resolved may fail with [`StorageError::NotFound`]; callers scanning
    /// folders treat both the same.
    async fn list(&self, prefix: &str) -> Result<Vec<StorageFile>, StorageError>;

    /// Metadata for one object
    async fn info(&self, id: &str) -> Result<StorageFile, StorageError>;

    /// Writes (or overwrites) an object outside the protected root
    async fn write(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StorageFile, StorageError>;

    /// Deletes an object, returning whether something was removed
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    /// The only sanctioned write into the protected root
    ///
    /// `path` is relative to the protected root; a path already starting
    /// with it is used as-is.
    async fn upload_to_protected_zone(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StorageFile, StorageError>;
}

pub type SharedStorage = Arc<dyn StorageGateway>;

/// Normalizes a write target and rejects the protected root
pub(crate) fn writable_path(layout: &StorageLayout, path: &str) -> Result<String, StorageError> {
    let normalized = normalize_path(path)?;
    if layout.is_protected(&normalized) {
        tracing::warn!(path = %path, "Rejected write under protected root");
        return Err(StorageError::ProtectedPath {
            path: path.to_string(),
            root: layout.protected_root.clone(),
        });
    }
    if normalized.is_empty() {
        return Err(quill_core::layout::AddressError::InvalidPath(path.to_string()).into());
    }
    Ok(normalized)
}

/// Last path segment
pub(crate) fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// MIME type for the handful of extensions the system produces
pub fn guess_mime_type(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "md" => "text/markdown",
        "txt" => "text/plain",
        "json" => "application/json",
        "png" => "image/png",
        "html" => "text/html",
        "js" => "text/javascript",
        "py" | "rs" | "ts" | "toml" | "yaml" | "yml" | "css" => "text/plain",
        _ => return None,
    };
    Some(mime)
}
