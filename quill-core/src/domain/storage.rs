//! Storage domain types

use serde::{Deserialize, Serialize};

/// Point-in-time metadata for one stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFile {
    /// Backend-specific opaque identifier
    pub id: String,
    /// Display name (last path segment)
    pub name: String,
    /// Full path inside the namespace
    pub path: String,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

impl StorageFile {
    /// Path relative to `prefix`, if the file lives below it
    pub fn relative_to<'a>(&'a self, prefix: &str) -> Option<&'a str> {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            return Some(self.path.as_str());
        }
        self.path
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
    }
}
