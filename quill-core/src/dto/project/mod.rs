//! Project DTOs: the owner-scoped project registry and browser

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::Payload;
use crate::domain::project::Project;
use crate::domain::storage::StorageFile;

/// Request to register a project
///
/// The project id is derived from `name` the same way pipelines name
/// their output folders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub source_job_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Option<Payload>,
}

/// One project as shown by the project browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub language: String,
    pub path: String,
    pub file_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl ProjectInfo {
    pub fn new(project: &Project, path: String, file_count: usize) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            description: project.description.clone(),
            language: project.language.clone(),
            path,
            file_count,
            updated_at: project.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectInfo>,
}

/// Full project record with its storage location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub path: String,
    pub file_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFiles {
    pub project_id: String,
    pub files: Vec<StorageFile>,
}

/// Returned by project deletion; generated files stay in storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDeleted {
    pub deleted: bool,
    pub project_id: String,
}
