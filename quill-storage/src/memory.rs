//! In-memory backend

use std::collections::BTreeMap;

use async_trait::async_trait;
use quill_core::domain::storage::StorageFile;
use quill_core::layout::{StorageLayout, normalize_path};
use tokio::sync::RwLock;

use crate::{StorageError, StorageGateway, file_name, writable_path};

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    mime_type: String,
}

/// Map-backed storage keyed by normalized path
///
/// Same protection rules as the disk backend. Listing an empty prefix
/// returns an empty list rather than `NotFound`.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    layout: StorageLayout,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: StorageLayout) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            layout,
        }
    }

    /// Every stored path, sorted
    pub async fn paths(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    fn describe(path: &str, object: &StoredObject) -> StorageFile {
        StorageFile {
            id: path.to_string(),
            name: file_name(path),
            path: path.to_string(),
            mime_type: Some(object.mime_type.clone()),
            size: Some(object.content.len() as u64),
        }
    }

    async fn put(&self, path: String, content: &[u8], mime_type: &str) -> StorageFile {
        let object = StoredObject {
            content: content.to_vec(),
            mime_type: mime_type.to_string(),
        };
        let file = Self::describe(&path, &object);
        self.objects.write().await.insert(path, object);
        file
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let normalized = normalize_path(path)?;
        self.objects
            .read()
            .await
            .get(&normalized)
            .map(|o| o.content.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        self.fetch(id).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StorageFile>, StorageError> {
        let normalized = normalize_path(prefix)?;
        let folder = if normalized.is_empty() {
            String::new()
        } else {
            format!("{}/", normalized)
        };

        let objects = self.objects.read().await;
        Ok(objects
            .iter()
            .filter(|(path, _)| path.starts_with(&folder))
            .map(|(path, object)| Self::describe(path, object))
            .collect())
    }

    async fn info(&self, id: &str) -> Result<StorageFile, StorageError> {
        let normalized = normalize_path(id)?;
        self.objects
            .read()
            .await
            .get(&normalized)
            .map(|o| Self::describe(&normalized, o))
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn write(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StorageFile, StorageError> {
        let normalized = writable_path(&self.layout, path)?;
        Ok(self.put(normalized, content, mime_type).await)
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let normalized = writable_path(&self.layout, id)?;
        Ok(self.objects.write().await.remove(&normalized).is_some())
    }

    async fn upload_to_protected_zone(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StorageFile, StorageError> {
        let target = self.layout.protected_path(path)?;
        Ok(self.put(target, content, mime_type).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_protected_root_is_read_only() {
        let storage = MemoryStorage::new();
        storage
            .upload_to_protected_zone("Notes/a.pdf", b"%PDF", "application/pdf")
            .await
            .unwrap();

        for path in ["raw/Notes/a.pdf", "RAW/x", "raw/x/", "Raw//x"] {
            assert!(matches!(
                storage.write(path, b"x", "text/plain").await,
                Err(StorageError::ProtectedPath { .. })
            ));
        }
        assert!(storage.delete("raw/Notes/a.pdf").await.is_err());
        assert_eq!(storage.fetch("raw/Notes/a.pdf").await.unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_list_matches_folder_boundaries() {
        let storage = MemoryStorage::new();
        storage.write("projects/todo/a.py", b"a", "text/plain").await.unwrap();
        storage.write("projects/todo2/b.py", b"b", "text/plain").await.unwrap();

        let files = storage.list("projects/todo").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "projects/todo/a.py");

        assert!(storage.list("projects/none").await.unwrap().is_empty());
        assert_eq!(storage.list("").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let storage = MemoryStorage::new();
        storage.write("notes/a.md", b"one", "text/markdown").await.unwrap();
        let file = storage.write("notes/a.md", b"three", "text/markdown").await.unwrap();

        assert_eq!(file.size, Some(5));
        assert_eq!(storage.paths().await, vec!["notes/a.md".to_string()]);
        assert_eq!(storage.info("notes/a.md").await.unwrap().size, Some(5));
    }
}
