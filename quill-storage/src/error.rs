//! Storage error types

use quill_core::layout::AddressError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Write-class operation aimed at the protected input root
    #[error("cannot write to '{root}/', it is read-only (path: {path})")]
    ProtectedPath { path: String, root: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidPath(#[from] AddressError),

    #[error("storage I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Maps an I/O error, turning `NotFound` into [`StorageError::NotFound`]
    pub(crate) fn from_io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Io {
                path: path.to_string(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
