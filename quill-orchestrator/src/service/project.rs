//! Project Service
//!
//! Owner-scoped project registry and the project browser. A caller only
//! sees and edits projects they own; the files under `projects/{id}` are
//! listed through the storage gateway once ownership is established.

use std::collections::BTreeMap;

use chrono::Utc;
use quill_core::domain::job::{Job, JobKind, JobStatus};
use quill_core::domain::project::{Project, ProjectChanges};
use quill_core::dto::project::{CreateProject, ProjectDetail, ProjectFiles, ProjectInfo};
use quill_core::layout::{StorageLayout, display_name, normalize_path, sanitize_name};
use quill_storage::{StorageError, StorageGateway};
use thiserror::Error;

use crate::repository::{ProjectRegistry, ProjectRegistryError};

/// Upper bound on projects read per owner
const MAX_PROJECTS: usize = 500;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Invalid project name: '{0}'")]
    InvalidName(String),

    #[error("Project {0} not found")]
    NotFound(String),

    #[error("Access to project {0} is forbidden")]
    Forbidden(String),

    #[error("Project {0} already exists")]
    AlreadyExists(String),

    #[error("No valid fields to update")]
    NoChanges,

    #[error(transparent)]
    Registry(ProjectRegistryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ProjectRegistryError> for ProjectError {
    fn from(err: ProjectRegistryError) -> Self {
        match err {
            ProjectRegistryError::NotFound(id) => ProjectError::NotFound(id),
            ProjectRegistryError::AlreadyExists(id) => ProjectError::AlreadyExists(id),
            other => ProjectError::Registry(other),
        }
    }
}

/// Folder id for a project name, as pipelines derive it
fn project_id(name: &str) -> Result<String, ProjectError> {
    let trimmed = name.trim();
    let id = sanitize_name(trimmed);
    match normalize_path(&id) {
        Ok(normalized) if !trimmed.is_empty() && normalized == id && !id.contains('/') => Ok(id),
        _ => Err(ProjectError::InvalidName(name.to_string())),
    }
}

/// Loads a project and checks that `owner` owns it
async fn owned_project(
    projects: &dyn ProjectRegistry,
    owner: &str,
    id: &str,
) -> Result<Project, ProjectError> {
    let id = sanitize_name(id);
    let (project, project_owner) = projects
        .get_with_owner(&id)
        .await?
        .ok_or_else(|| ProjectError::NotFound(id.clone()))?;

    if project_owner != owner {
        tracing::warn!(project_id = %id, owner = %owner, "Project access denied");
        return Err(ProjectError::Forbidden(id));
    }
    Ok(project)
}

/// Number of stored files per project folder
async fn file_counts(storage: &dyn StorageGateway) -> Result<BTreeMap<String, usize>, StorageError> {
    let layout = storage.layout();
    let files = match storage.list(&layout.projects_root).await {
        Ok(files) => files,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e),
    };

    let mut counts = BTreeMap::new();
    for file in &files {
        if let Some(project) = layout.project_of(&file.path) {
            *counts.entry(project.to_string()).or_default() += 1;
        }
    }
    Ok(counts)
}

// =============================================================================
// Registry Operations
// =============================================================================

/// Registers a project for `owner`
pub async fn create_project(
    projects: &dyn ProjectRegistry,
    owner: &str,
    req: CreateProject,
) -> Result<Project, ProjectError> {
    let id = project_id(&req.name)?;

    let mut project = Project::new(id, req.name.trim());
    project.description = req.description.unwrap_or_default();
    project.language = req.language.unwrap_or_default();
    project.framework = req.framework.unwrap_or_default();
    project.source_job_id = req.source_job_id;
    project.metadata = req.metadata.unwrap_or_default();

    let project = projects.create(project, owner).await?;
    tracing::info!(project_id = %project.id, owner = %owner, "Project registered");
    Ok(project)
}

/// Project record with its location and current file count
pub async fn get_project(
    projects: &dyn ProjectRegistry,
    storage: &dyn StorageGateway,
    owner: &str,
    id: &str,
) -> Result<ProjectDetail, ProjectError> {
    let project = owned_project(projects, owner, id).await?;
    let file_count = file_counts(storage).await?.remove(&project.id).unwrap_or(0);

    Ok(ProjectDetail {
        path: storage.layout().project_root(&project.id),
        file_count,
        project,
    })
}

pub async fn update_project(
    projects: &dyn ProjectRegistry,
    owner: &str,
    id: &str,
    changes: ProjectChanges,
) -> Result<Project, ProjectError> {
    let mut project = owned_project(projects, owner, id).await?;
    if !project.apply(changes, Utc::now()) {
        return Err(ProjectError::NoChanges);
    }
    Ok(projects.update(&project).await?)
}

/// Drops the registry record; the project's files stay in storage
pub async fn delete_project(
    projects: &dyn ProjectRegistry,
    owner: &str,
    id: &str,
) -> Result<String, ProjectError> {
    let project = owned_project(projects, owner, id).await?;
    projects.delete(&project.id).await?;
    tracing::info!(project_id = %project.id, owner = %owner, "Project deleted");
    Ok(project.id)
}

// =============================================================================
// Browser
// =============================================================================

/// The caller's projects, sorted by name
///
/// `search` filters case-insensitively on id, name and description.
pub async fn list_projects(
    projects: &dyn ProjectRegistry,
    storage: &dyn StorageGateway,
    owner: &str,
    search: Option<&str>,
) -> Result<Vec<ProjectInfo>, ProjectError> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let owned = projects.list_by_owner(owner, MAX_PROJECTS).await?;
    let counts = file_counts(storage).await?;
    let layout = storage.layout();

    let mut listed: Vec<ProjectInfo> = owned
        .iter()
        .filter(|p| match &needle {
            Some(needle) => [&p.id, &p.name, &p.description]
                .iter()
                .any(|field| field.to_lowercase().contains(needle)),
            None => true,
        })
        .map(|p| {
            let count = counts.get(&p.id).copied().unwrap_or(0);
            ProjectInfo::new(p, layout.project_root(&p.id), count)
        })
        .collect();

    listed.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(listed)
}

/// Files of one of the caller's projects
pub async fn project_files(
    projects: &dyn ProjectRegistry,
    storage: &dyn StorageGateway,
    owner: &str,
    id: &str,
) -> Result<ProjectFiles, ProjectError> {
    let project = owned_project(projects, owner, id).await?;
    let root = storage.layout().project_root(&project.id);

    let files = match storage.list(&root).await {
        Ok(files) => files,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    Ok(ProjectFiles {
        project_id: project.id,
        files,
    })
}

// =============================================================================
// Job Output
// =============================================================================

/// Registers the project a completed job wrote, owned by the job's owner
///
/// Returns `None` for jobs without project output. A project that already
/// exists is only touched when `owner` owns it; someone else's record is
/// left alone.
pub async fn record_job_project(
    projects: &dyn ProjectRegistry,
    layout: &StorageLayout,
    owner: &str,
    job: &Job,
) -> Result<Option<Project>, ProjectError> {
    if job.status != JobStatus::Completed || job.kind == JobKind::Summarize {
        return Ok(None);
    }
    let Some(id) = job_project_id(layout, job) else {
        return Ok(None);
    };

    match projects.get_with_owner(&id).await? {
        Some((mut project, project_owner)) if project_owner == owner => {
            project.updated_at = Utc::now();
            Ok(Some(projects.update(&project).await?))
        }
        Some((_, project_owner)) => {
            tracing::warn!(
                project_id = %id,
                owner = %owner,
                project_owner = %project_owner,
                job_id = %job.id,
                "Job wrote into a project registered to another owner"
            );
            Ok(None)
        }
        None => {
            let result = job.result.as_ref();
            let text = |key: &str| {
                result
                    .and_then(|r| r.get(key))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };

            let name = text("project_name").unwrap_or_else(|| display_name(&id));
            let mut project = Project::new(id, name).with_source_job(job.id);
            project.description = text("description").unwrap_or_default();
            project.language = result
                .and_then(|r| r.get("structure"))
                .and_then(|s| s.get("language"))
                .and_then(|v| v.as_str())
                .or_else(|| {
                    result
                        .and_then(|r| r.get("tech_stack"))
                        .and_then(|v| v.get(0))
                        .and_then(|v| v.as_str())
                })
                .unwrap_or_default()
                .to_string();

            let project = projects.create(project, owner).await?;
            tracing::info!(project_id = %project.id, owner = %owner, job_id = %job.id, "Project registered from job");
            Ok(Some(project))
        }
    }
}

/// Folder id of a job's project output (`projects/{id}`)
fn job_project_id(layout: &StorageLayout, job: &Job) -> Option<String> {
    let path = job.output_path.as_deref()?;
    let rest = path
        .trim_matches('/')
        .strip_prefix(layout.projects_root.as_str())?
        .strip_prefix('/')?;
    (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryProjectRegistry;
    use quill_core::domain::job::Payload;
    use quill_core::domain::pipeline::PipelineResult;
    use quill_storage::MemoryStorage;
    use serde_json::json;

    fn create(name: &str) -> CreateProject {
        CreateProject {
            name: name.to_string(),
            description: None,
            language: None,
            framework: None,
            source_job_id: None,
            metadata: None,
        }
    }

    fn completed(kind: JobKind, output: serde_json::Value) -> Job {
        let mut job = Job::new(kind, "raw/Create_Project/a.pdf");
        job.start(Utc::now()).unwrap();
        let output: Payload = serde_json::from_value(output).unwrap();
        job.finish(PipelineResult::succeeded(output), Utc::now()).unwrap();
        job
    }

    #[tokio::test]
    async fn test_create_derives_folder_id() {
        let projects = InMemoryProjectRegistry::new();
        let project = create_project(&projects, "alice", create("  todo app ")).await.unwrap();
        assert_eq!(project.id, "todo_app");
        assert_eq!(project.name, "todo app");

        assert!(matches!(
            create_project(&projects, "bob", create("todo app")).await,
            Err(ProjectError::AlreadyExists(id)) if id == "todo_app"
        ));
        for bad in ["", "   ", "../etc", "a/b"] {
            assert!(
                matches!(create_project(&projects, "alice", create(bad)).await, Err(ProjectError::InvalidName(_))),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn test_browser_is_owner_scoped() {
        let projects = InMemoryProjectRegistry::new();
        let storage = MemoryStorage::new();
        create_project(&projects, "alice", create("todo app")).await.unwrap();
        create_project(&projects, "bob", create("blog-engine")).await.unwrap();
        for path in [
            "projects/todo_app/src/main.py",
            "projects/todo_app/README.md",
            "projects/blog-engine/index.js",
            "projects/stray.txt",
        ] {
            storage.write(path, b"x", "text/plain").await.unwrap();
        }

        let listed = list_projects(&projects, &storage, "alice", None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "todo_app");
        assert_eq!(listed[0].path, "projects/todo_app");
        assert_eq!(listed[0].file_count, 2);

        assert!(list_projects(&projects, &storage, "alice", Some("blog")).await.unwrap().is_empty());
        assert_eq!(list_projects(&projects, &storage, "bob", Some("BLOG")).await.unwrap().len(), 1);

        let files = project_files(&projects, &storage, "alice", "todo app").await.unwrap();
        assert_eq!(files.project_id, "todo_app");
        assert_eq!(files.files.len(), 2);

        assert!(matches!(
            project_files(&projects, &storage, "alice", "blog-engine").await,
            Err(ProjectError::Forbidden(_))
        ));
        assert!(matches!(
            project_files(&projects, &storage, "alice", "ghost").await,
            Err(ProjectError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_require_ownership() {
        let projects = InMemoryProjectRegistry::new();
        let storage = MemoryStorage::new();
        create_project(&projects, "alice", create("todo app")).await.unwrap();
        storage.write("projects/todo_app/main.py", b"x", "text/plain").await.unwrap();

        let changes = ProjectChanges {
            description: Some("Chores".into()),
            ..ProjectChanges::default()
        };
        assert!(matches!(
            update_project(&projects, "bob", "todo_app", changes.clone()).await,
            Err(ProjectError::Forbidden(_))
        ));
        assert!(matches!(
            update_project(&projects, "alice", "todo_app", ProjectChanges::default()).await,
            Err(ProjectError::NoChanges)
        ));
        let updated = update_project(&projects, "alice", "todo_app", changes).await.unwrap();
        assert_eq!(updated.description, "Chores");

        let detail = get_project(&projects, &storage, "alice", "todo_app").await.unwrap();
        assert_eq!(detail.file_count, 1);
        assert_eq!(detail.project.description, "Chores");

        assert!(matches!(
            delete_project(&projects, "bob", "todo_app").await,
            Err(ProjectError::Forbidden(_))
        ));
        assert_eq!(delete_project(&projects, "alice", "todo_app").await.unwrap(), "todo_app");
        assert!(projects.get_with_owner("todo_app").await.unwrap().is_none());
        // Files are kept
        assert_eq!(storage.fetch("projects/todo_app/main.py").await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_completed_job_registers_project() {
        let projects = InMemoryProjectRegistry::new();
        let layout = StorageLayout::default();
        let job = completed(
            JobKind::CreateProject,
            json!({
                "project_name": "todo cli",
                "project_path": "projects/todo_cli",
                "structure": {"language": "rust"}
            }),
        );

        let project = record_job_project(&projects, &layout, "alice", &job)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.id, "todo_cli");
        assert_eq!(project.name, "todo cli");
        assert_eq!(project.language, "rust");
        assert_eq!(project.source_job_id, Some(job.id));

        // A second job into someone else's project does not take it over
        let again = completed(
            JobKind::InferAction,
            json!({"project_path": "projects/todo_cli", "tech_stack": ["go"]}),
        );
        assert!(record_job_project(&projects, &layout, "bob", &again).await.unwrap().is_none());
        let (_, owner) = projects.get_with_owner("todo_cli").await.unwrap().unwrap();
        assert_eq!(owner, "alice");
    }

    #[tokio::test]
    async fn test_jobs_without_project_output_are_ignored() {
        let projects = InMemoryProjectRegistry::new();
        let layout = StorageLayout::default();

        let summary = completed(JobKind::Summarize, json!({"output_path": "notes/Notes/a.md"}));
        assert!(record_job_project(&projects, &layout, "alice", &summary).await.unwrap().is_none());

        let pending = Job::new(JobKind::CreateProject, "raw/Create_Project/a.pdf");
        assert!(record_job_project(&projects, &layout, "alice", &pending).await.unwrap().is_none());
        assert!(projects.list_by_owner("alice", 10).await.unwrap().is_empty());
    }
}
