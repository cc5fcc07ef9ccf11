//! Local filesystem backend
//!
//! Objects are plain files below a root directory; the identifier of an
//! object is its normalized path relative to that root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quill_core::domain::storage::StorageFile;
use quill_core::layout::{StorageLayout, normalize_path};

use crate::{StorageError, StorageGateway, file_name, guess_mime_type, writable_path};

pub struct LocalStorage {
    root: PathBuf,
    layout: StorageLayout,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_layout(root, StorageLayout::default())
    }

    pub fn with_layout(root: impl Into<PathBuf>, layout: StorageLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, normalized: &str) -> PathBuf {
        normalized
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    async fn write_normalized(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StorageFile, StorageError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::from_io(path, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| StorageError::from_io(path, e))?;

        tracing::debug!(path = %path, bytes = content.len(), "Wrote file");

        Ok(StorageFile {
            id: path.to_string(),
            name: file_name(path),
            path: path.to_string(),
            mime_type: Some(mime_type.to_string()),
            size: Some(content.len() as u64),
        })
    }

    fn describe(path: &str, size: u64) -> StorageFile {
        StorageFile {
            id: path.to_string(),
            name: file_name(path),
            path: path.to_string(),
            mime_type: guess_mime_type(path).map(str::to_string),
            size: Some(size),
        }
    }
}

#[async_trait]
impl StorageGateway for LocalStorage {
    fn backend(&self) -> &'static str {
        "local"
    }

    fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let normalized = normalize_path(path)?;
        tokio::fs::read(self.resolve(&normalized))
            .await
            .map_err(|e| StorageError::from_io(path, e))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        self.fetch(id).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StorageFile>, StorageError> {
        let normalized = normalize_path(prefix)?;
        let base = self.resolve(&normalized);

        let metadata = tokio::fs::metadata(&base)
            .await
            .map_err(|e| StorageError::from_io(prefix, e))?;
        if !metadata.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut pending = vec![(base, normalized)];

        while let Some((dir, rel)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| StorageError::from_io(&rel, e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::from_io(&rel, e))?
            {
                let name = entry.file_name().to_string_lossy().to_string();
                let child = if rel.is_empty() {
                    name
                } else {
                    format!("{}/{}", rel, name)
                };

                let meta = entry
                    .metadata()
                    .await
                    .map_err(|e| StorageError::from_io(&child, e))?;

                if meta.is_dir() {
                    pending.push((entry.path(), child));
                } else {
                    files.push(Self::describe(&child, meta.len()));
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn info(&self, id: &str) -> Result<StorageFile, StorageError> {
        let normalized = normalize_path(id)?;
        let meta = tokio::fs::metadata(self.resolve(&normalized))
            .await
            .map_err(|e| StorageError::from_io(id, e))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(Self::describe(&normalized, meta.len()))
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StorageFile, StorageError> {
        let normalized = writable_path(&self.layout, path)?;
        self.write_normalized(&normalized, content, mime_type).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let normalized = writable_path(&self.layout, id)?;
        match tokio::fs::remove_file(self.resolve(&normalized)).await {
            Ok(()) => {
                tracing::debug!(path = %normalized, "Deleted file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from_io(id, e)),
        }
    }

    async fn upload_to_protected_zone(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StorageFile, StorageError> {
        let target = self.layout.protected_path(path)?;
        tracing::info!(path = %target, bytes = content.len(), "Uploading to protected root");
        self.write_normalized(&target, content, mime_type).await
    }
}
