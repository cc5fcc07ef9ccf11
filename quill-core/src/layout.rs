//! Storage addressing scheme
//!
//! Every service agrees on three roots inside the storage namespace:
//! - the protected input root (`raw/`), holding uploaded source documents,
//!   organised by mode folder: `raw/{Mode}/{file}.pdf`
//! - the notes root (`notes/`), where summaries are written
//! - the projects root (`projects/`), one folder per generated project
//!
//! Paths are validated here once, instead of being split ad hoc at each
//! call site.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::job::JobKind;

/// Recognized document extension (compared case-insensitively)
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Mode folders scanned below the protected root
pub const MODE_FOLDERS: [&str; 3] = ["Notes", "Create_Project", "Existing_Project"];

/// Name used when a project name sanitizes to nothing
pub const DEFAULT_PROJECT_NAME: &str = "project";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("path '{path}' must be under '{root}/'")]
    OutsideProtectedRoot { path: String, root: String },

    #[error("'{0}' is not a .pdf document")]
    NotADocument(String),

    #[error("'{0}' has no mode folder")]
    MissingModeFolder(String),

    #[error(transparent)]
    UnknownMode(#[from] UnknownTriggerMode),
}

/// Mode folder that does not map to any job kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown mode folder: {0}")]
pub struct UnknownTriggerMode(pub String);

/// Maps a mode folder name to its job kind
///
/// Lookup is case-insensitive and treats whitespace like `_`, so
/// `Create Project`, `create_project` and `CREATE_PROJECT` are the same folder.
pub fn mode_kind(folder: &str) -> Result<JobKind, UnknownTriggerMode> {
    let normalized: String = folder
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    match normalized.as_str() {
        "notes" => Ok(JobKind::Summarize),
        "create_project" => Ok(JobKind::CreateProject),
        "existing_project" => Ok(JobKind::ModifyProject),
        _ => Err(UnknownTriggerMode(folder.to_string())),
    }
}

/// Collapses repeated slashes and strips leading/trailing ones
///
/// Rejects `.` and `..` segments so no path can escape its root.
pub fn normalize_path(path: &str) -> Result<String, AddressError> {
    let mut segments = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." || segment.contains('\\') {
            return Err(AddressError::InvalidPath(path.to_string()));
        }
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// Replaces every whitespace run with `_`
pub fn sanitize_name(name: &str) -> String {
    let sanitized = name.split_whitespace().collect::<Vec<_>>().join("_");
    if sanitized.is_empty() {
        DEFAULT_PROJECT_NAME.to_string()
    } else {
        sanitized
    }
}

/// Human-readable project name: `todo_app` / `todo-app` become `todo app`
pub fn display_name(project_id: &str) -> String {
    project_id.replace(['_', '-'], " ")
}

/// Whether `path` ends in the recognized document extension, case-insensitively
pub fn has_document_extension(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
        .unwrap_or(false)
}

/// Names of the three storage roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    pub protected_root: String,
    pub notes_root: String,
    pub projects_root: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            protected_root: "raw".to_string(),
            notes_root: "notes".to_string(),
            projects_root: "projects".to_string(),
        }
    }
}

impl StorageLayout {
    /// Whether `path` lies under the protected root
    ///
    /// Comparison is case-insensitive on the first segment after slash
    /// normalization: `RAW/x`, `raw/x/`, `Raw//x` and `raw` itself all match,
    /// `rawdata/x` does not.
    pub fn is_protected(&self, path: &str) -> bool {
        path.split('/')
            .find(|s| !s.is_empty())
            .map(|first| first.eq_ignore_ascii_case(&self.protected_root))
            .unwrap_or(false)
    }

    /// Resolves an upload destination under the protected root
    ///
    /// A path already starting with the root is kept as-is, anything else
    /// is prefixed with it.
    pub fn protected_path(&self, path: &str) -> Result<String, AddressError> {
        let normalized = normalize_path(path)?;
        if normalized.is_empty() {
            return Err(AddressError::InvalidPath(path.to_string()));
        }
        if self.is_protected(&normalized) {
            Ok(normalized)
        } else {
            Ok(format!("{}/{}", self.protected_root, normalized))
        }
    }

    /// Summary location for a source document
    ///
    /// Replaces the protected root segment with the notes root and swaps the
    /// extension for `.md`: `raw/Notes/x.pdf` becomes `notes/Notes/x.md`.
    pub fn summary_output_path(&self, document: &DocumentPath) -> String {
        let rest = &document.segments()[1..];
        let mut path = format!("{}/{}", self.notes_root, rest.join("/"));
        if let Some(dot) = path.rfind('.').filter(|&i| i > path.rfind('/').unwrap_or(0)) {
            path.truncate(dot);
        }
        path.push_str(".md");
        path
    }

    /// Root folder of a project: `projects/{sanitized name}`
    pub fn project_root(&self, name: &str) -> String {
        format!("{}/{}", self.projects_root, sanitize_name(name))
    }

    /// Location of one project file, rejecting paths that escape the project
    pub fn project_file(&self, project_root: &str, relative: &str) -> Result<String, AddressError> {
        let normalized = normalize_path(relative)?;
        if normalized.is_empty() {
            return Err(AddressError::InvalidPath(relative.to_string()));
        }
        Ok(format!("{}/{}", project_root.trim_end_matches('/'), normalized))
    }

    /// Project folder a path belongs to, if it lies under the projects root
    pub fn project_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        if segments.next()? != self.projects_root {
            return None;
        }
        let project = segments.next()?;
        // Only folders count, a file directly under projects/ is no project
        segments.next().map(|_| project)
    }
}

/// Validated reference to a source document under the protected root
///
/// Shape: `{protected_root}/{mode folder}/.../{name}.pdf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    path: String,
}

impl DocumentPath {
    pub fn parse(layout: &StorageLayout, path: &str) -> Result<Self, AddressError> {
        let normalized = normalize_path(path)?;
        if !layout.is_protected(&normalized) {
            return Err(AddressError::OutsideProtectedRoot {
                path: path.to_string(),
                root: layout.protected_root.clone(),
            });
        }
        if !has_document_extension(&normalized) {
            return Err(AddressError::NotADocument(path.to_string()));
        }
        if normalized.split('/').count() < 3 {
            return Err(AddressError::MissingModeFolder(path.to_string()));
        }
        Ok(Self { path: normalized })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    fn segments(&self) -> Vec<&str> {
        self.path.split('/').collect()
    }

    /// Second segment, naming the pipeline mode
    pub fn mode_folder(&self) -> &str {
        self.path.split('/').nth(1).unwrap_or_default()
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Job kind implied by the mode folder
    pub fn kind(&self) -> Result<JobKind, UnknownTriggerMode> {
        mode_kind(self.mode_folder())
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}
