//! Project Registry
//!
//! Owner-scoped records of generated projects, keyed by their folder id.
//! Like the job registry it stores the owner next to each record and
//! leaves the ownership checks to the service layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::domain::job::Payload;
use quill_core::domain::project::Project;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProjectRegistryError {
    #[error("Project {0} not found")]
    NotFound(String),

    #[error("Project {0} already exists")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage contract for projects
#[async_trait]
pub trait ProjectRegistry: Send + Sync {
    /// Stores a new project under `owner`; an existing id is a conflict
    async fn create(&self, project: Project, owner: &str) -> Result<Project, ProjectRegistryError>;

    /// Project together with the identity that owns it
    async fn get_with_owner(&self, id: &str) -> Result<Option<(Project, String)>, ProjectRegistryError>;

    /// Overwrites the editable fields and `updated_at` of a stored project
    async fn update(&self, project: &Project) -> Result<Project, ProjectRegistryError>;

    /// Removes the record; false when there was none
    async fn delete(&self, id: &str) -> Result<bool, ProjectRegistryError>;

    /// Projects owned by `owner`, most recently updated first
    async fn list_by_owner(&self, owner: &str, limit: usize) -> Result<Vec<Project>, ProjectRegistryError>;
}

// =============================================================================
// Postgres implementation
// =============================================================================

const PROJECT_COLUMNS: &str = "id, name, description, language, framework, source_job_id, \
    metadata, created_at, updated_at";

pub struct PgProjectRegistry {
    pool: PgPool,
}

impl PgProjectRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRegistry for PgProjectRegistry {
    async fn create(&self, project: Project, owner: &str) -> Result<Project, ProjectRegistryError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO projects (id, owner, name, description, language, framework,
                                  source_job_id, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&project.id)
        .bind(owner)
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.language)
        .bind(&project.framework)
        .bind(project.source_job_id)
        .bind(serde_json::Value::Object(project.metadata.clone()))
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(ProjectRegistryError::AlreadyExists(project.id));
        }
        Ok(project)
    }

    async fn get_with_owner(&self, id: &str) -> Result<Option<(Project, String)>, ProjectRegistryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS}, owner FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let owner = r.owner.clone();
            (Project::from(r), owner)
        }))
    }

    async fn update(&self, project: &Project) -> Result<Project, ProjectRegistryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            UPDATE projects SET
                name = $2,
                description = $3,
                language = $4,
                framework = $5,
                metadata = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}, owner
            "#
        ))
        .bind(&project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.language)
        .bind(&project.framework)
        .bind(serde_json::Value::Object(project.metadata.clone()))
        .bind(project.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ProjectRegistryError::NotFound(project.id.clone()))?;

        Ok(Project::from(row))
    }

    async fn delete(&self, id: &str) -> Result<bool, ProjectRegistryError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(&self, owner: &str, limit: usize) -> Result<Vec<Project>, ProjectRegistryError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS}, owner FROM projects WHERE owner = $1 ORDER BY updated_at DESC LIMIT $2"
        ))
        .bind(owner)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Project::from).collect())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    description: String,
    language: String,
    framework: String,
    source_job_id: Option<Uuid>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner: String,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        let metadata = match row.metadata {
            Some(serde_json::Value::Object(map)) => map,
            _ => Payload::new(),
        };

        Project {
            id: row.id,
            name: row.name,
            description: row.description,
            language: row.language,
            framework: row.framework,
            source_job_id: row.source_job_id,
            metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
