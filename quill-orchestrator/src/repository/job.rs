//! Job Registry
//!
//! Durable record of job lifecycle, keyed by id and scoped by owner.
//! The registry stores and merges; it performs no authorization and no
//! status validation of its own.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use quill_core::domain::job::{Job, JobKind, JobStatus, Payload};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Stored job {id} is unreadable: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage contract for jobs
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Stores a new job under `owner`
    async fn create(&self, job: Job, owner: &str) -> Result<Job, RegistryError>;

    async fn get(&self, id: Uuid) -> Result<Option<Job>, RegistryError>;

    /// Job together with the identity that created it
    async fn get_with_owner(&self, id: Uuid) -> Result<Option<(Job, String)>, RegistryError>;

    /// Partial merge of `job` into the stored record
    ///
    /// Status is always written. Every other field is applied only when
    /// present and non-empty, so a field once set cannot be cleared here.
    /// Returns the merged record.
    async fn update(&self, job: &Job) -> Result<Job, RegistryError>;

    /// Jobs created by `owner`, most recent first
    async fn list_by_owner(&self, owner: &str, limit: usize) -> Result<Vec<Job>, RegistryError>;

    /// The latest `limit` jobs across all owners; callers sort the result
    async fn list_recent(&self, limit: usize) -> Result<Vec<Job>, RegistryError>;

    /// Jobs in `status`, oldest first
    async fn list_by_status(&self, status: JobStatus, limit: usize) -> Result<Vec<Job>, RegistryError>;
}

/// Applies the non-empty fields of `patch` onto `stored`
pub(crate) fn merge_job(stored: &mut Job, patch: &Job) {
    fn text(field: &Option<String>) -> Option<String> {
        field.as_ref().filter(|s| !s.is_empty()).cloned()
    }

    stored.status = patch.status;
    if let Some(v) = text(&patch.instruction) {
        stored.instruction = Some(v);
    }
    if let Some(v) = text(&patch.project_ref) {
        stored.project_ref = Some(v);
    }
    if let Some(v) = text(&patch.project_name) {
        stored.project_name = Some(v);
    }
    if let Some(v) = text(&patch.output_path) {
        stored.output_path = Some(v);
    }
    if let Some(v) = text(&patch.error) {
        stored.error = Some(v);
    }
    if let Some(result) = &patch.result {
        stored.result = Some(result.clone());
    }
    if let Some(at) = patch.started_at {
        stored.started_at = Some(at);
    }
    if let Some(at) = patch.completed_at {
        stored.completed_at = Some(at);
    }
}

// =============================================================================
// Postgres implementation
// =============================================================================

const JOB_COLUMNS: &str = "id, kind, status, document_path, instruction, project_ref, \
    project_name, output_path, result, error, created_at, started_at, completed_at";

pub struct PgJobRegistry {
    pool: PgPool,
    ttl: Duration,
}

impl PgJobRegistry {
    /// # Arguments
    /// * `pool` - Connection pool with migrations applied
    /// * `ttl_days` - Retention stamped into `expires_at` on creation
    pub fn new(pool: PgPool, ttl_days: i64) -> Self {
        Self {
            pool,
            ttl: Duration::days(ttl_days),
        }
    }
}

#[async_trait]
impl JobRegistry for PgJobRegistry {
    async fn create(&self, job: Job, owner: &str) -> Result<Job, RegistryError> {
        let expires_at = job.created_at + self.ttl;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, owner, kind, status, document_path, instruction, project_ref,
                              project_name, output_path, result, error, created_at, started_at,
                              completed_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(job.id)
        .bind(owner)
        .bind(job.kind.as_str())
        .bind(job.status.as_str())
        .bind(&job.document_path)
        .bind(&job.instruction)
        .bind(&job.project_ref)
        .bind(&job.project_name)
        .bind(&job.output_path)
        .bind(job.result.clone().map(serde_json::Value::Object))
        .bind(&job.error)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, RegistryError> {
        Ok(self.get_with_owner(id).await?.map(|(job, _)| job))
    }

    async fn get_with_owner(&self, id: Uuid) -> Result<Option<(Job, String)>, RegistryError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS}, owner FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let owner = r.owner.clone().unwrap_or_default();
            Job::try_from(r).map(|job| (job, owner))
        })
        .transpose()
    }

    async fn update(&self, job: &Job) -> Result<Job, RegistryError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs SET
                status = $2,
                instruction = COALESCE(NULLIF($3, ''), instruction),
                project_ref = COALESCE(NULLIF($4, ''), project_ref),
                project_name = COALESCE(NULLIF($5, ''), project_name),
                output_path = COALESCE(NULLIF($6, ''), output_path),
                result = COALESCE($7, result),
                error = COALESCE(NULLIF($8, ''), error),
                started_at = COALESCE($9, started_at),
                completed_at = COALESCE($10, completed_at)
            WHERE id = $1
            RETURNING {JOB_COLUMNS}, owner
            "#
        ))
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(&job.instruction)
        .bind(&job.project_ref)
        .bind(&job.project_name)
        .bind(&job.output_path)
        .bind(job.result.clone().map(serde_json::Value::Object))
        .bind(&job.error)
        .bind(job.started_at)
        .bind(job.completed_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RegistryError::NotFound(job.id))?;

        Job::try_from(row)
    }

    async fn list_by_owner(&self, owner: &str, limit: usize) -> Result<Vec<Job>, RegistryError> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS}, owner FROM jobs WHERE owner = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(owner)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Job>, RegistryError> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS}, owner FROM jobs ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn list_by_status(&self, status: JobStatus, limit: usize) -> Result<Vec<Job>, RegistryError> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS}, owner FROM jobs WHERE status = $1 ORDER BY created_at ASC LIMIT $2"
        ))
        .bind(status.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    kind: String,
    status: String,
    document_path: String,
    instruction: Option<String>,
    project_ref: Option<String>,
    project_name: Option<String>,
    output_path: Option<String>,
    result: Option<serde_json::Value>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    owner: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = RegistryError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = move |reason: String| RegistryError::Corrupt { id, reason };

        let kind = row
            .kind
            .parse::<JobKind>()
            .map_err(|e| corrupt(e.to_string()))?;
        let status = row.status.parse::<JobStatus>().map_err(corrupt)?;
        let result = match row.result {
            Some(serde_json::Value::Object(map)) => Some(map),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => {
                let mut wrapped = Payload::new();
                wrapped.insert("value".into(), other);
                Some(wrapped)
            }
        };

        Ok(Job {
            id: row.id,
            kind,
            status,
            document_path: row.document_path,
            instruction: row.instruction,
            project_ref: row.project_ref,
            project_name: row.project_name,
            output_path: row.output_path,
            result,
            error: row.error,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_applies_only_present_fields() {
        let mut stored = Job::new(JobKind::Summarize, "raw/Notes/a.pdf")
            .with_instruction(Some("keep it short".into()));

        let mut patch = stored.clone();
        patch.instruction = None;
        patch.error = Some(String::new());
        patch.status = JobStatus::Processing;
        patch.started_at = Some(Utc::now());

        merge_job(&mut stored, &patch);
        assert_eq!(stored.status, JobStatus::Processing);
        assert!(stored.started_at.is_some());
        assert_eq!(stored.instruction.as_deref(), Some("keep it short"));
        assert!(stored.error.is_none());
    }

    #[test]
    fn test_row_with_unknown_kind_is_corrupt() {
        let row = JobRow {
            id: Uuid::new_v4(),
            kind: "translate".into(),
            status: "pending".into(),
            document_path: "raw/Notes/a.pdf".into(),
            instruction: None,
            project_ref: None,
            project_name: None,
            output_path: None,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            owner: Some("alice".into()),
        };
        assert!(matches!(Job::try_from(row), Err(RegistryError::Corrupt { .. })));
    }
}
