//! Job Service
//!
//! Business logic for job submission and lifecycle. Every status change goes
//! through the transitions on [`Job`]; the registry only persists them.

use chrono::Utc;
use quill_core::domain::job::{Job, JobKind, JobStatus, UnknownJobKind};
use quill_core::domain::pipeline::PipelineResult;
use quill_core::dto::job::{ExecuteRequest, JobSummary, SubmitJob};
use quill_core::layout::{AddressError, DocumentPath, StorageLayout, sanitize_name};
use thiserror::Error;
use uuid::Uuid;

use crate::repository::{JobRegistry, RegistryError};

/// Default and ceiling for list endpoints
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    InvalidKind(#[from] UnknownJobKind),

    #[error(transparent)]
    InvalidPath(#[from] AddressError),

    #[error("project_ref is required for modify_project jobs")]
    MissingProjectRef,

    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Access to job {0} is forbidden")]
    Forbidden(Uuid),

    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for JobError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => JobError::NotFound(id),
            other => JobError::Registry(other),
        }
    }
}

/// Builds a pending job from a submission, validating it synchronously
///
/// # Arguments
/// * `layout` - Addressing scheme the document path must fit
/// * `req` - Raw submission as received from the caller
pub fn validate_submission(layout: &StorageLayout, req: SubmitJob) -> Result<Job, JobError> {
    let kind = req.kind.parse::<JobKind>()?;
    let document = DocumentPath::parse(layout, &req.document_path)?;

    let project_ref = req.project_ref.filter(|s| !s.trim().is_empty());
    if kind == JobKind::ModifyProject && project_ref.is_none() {
        return Err(JobError::MissingProjectRef);
    }

    Ok(Job::new(kind, document.as_str())
        .with_instruction(req.instruction)
        .with_project_ref(project_ref)
        .with_project_name(req.project_name))
}

/// Validates and stores a new job for `owner`
pub async fn submit_job(
    registry: &dyn JobRegistry,
    layout: &StorageLayout,
    owner: &str,
    req: SubmitJob,
) -> Result<Job, JobError> {
    let job = validate_submission(layout, req)?;
    let job = registry.create(job, owner).await?;

    tracing::info!(job_id = %job.id, kind = %job.kind, owner = %owner, "Job submitted");

    Ok(job)
}

/// Submits an infer-action job; the project name is sanitized up front
pub async fn submit_execute(
    registry: &dyn JobRegistry,
    layout: &StorageLayout,
    owner: &str,
    req: ExecuteRequest,
) -> Result<Job, JobError> {
    let project_name = req
        .project_name
        .filter(|s| !s.trim().is_empty())
        .map(|name| sanitize_name(&name));

    let submission = SubmitJob {
        kind: JobKind::InferAction.as_str().to_string(),
        document_path: req.document_path,
        instruction: req.instruction,
        project_ref: None,
        project_name,
    };
    submit_job(registry, layout, owner, submission).await
}

/// Gets a job, enforcing that only its creator may read it
pub async fn get_job_for_owner(
    registry: &dyn JobRegistry,
    id: Uuid,
    owner: &str,
) -> Result<Job, JobError> {
    let (job, job_owner) = registry
        .get_with_owner(id)
        .await?
        .ok_or(JobError::NotFound(id))?;

    if job_owner != owner {
        tracing::warn!(job_id = %id, caller = %owner, "Job requested by non-owner");
        return Err(JobError::Forbidden(id));
    }

    Ok(job)
}

/// Abbreviated jobs of `owner`, most recent first
pub async fn list_jobs(
    registry: &dyn JobRegistry,
    owner: &str,
    limit: Option<usize>,
) -> Result<Vec<JobSummary>, JobError> {
    let jobs = registry.list_by_owner(owner, clamp_limit(limit)).await?;
    Ok(jobs.into_iter().map(JobSummary::from).collect())
}

/// Most recent jobs of every owner, newest first
pub async fn list_recent_jobs(
    registry: &dyn JobRegistry,
    limit: Option<usize>,
) -> Result<Vec<Job>, JobError> {
    let mut jobs = registry.list_recent(clamp_limit(limit)).await?;
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(jobs)
}

/// Pending jobs, oldest first
pub async fn list_scheduled_jobs(
    registry: &dyn JobRegistry,
    limit: Option<usize>,
) -> Result<Vec<Job>, JobError> {
    Ok(registry
        .list_by_status(JobStatus::Pending, clamp_limit(limit))
        .await?)
}

/// Moves a pending job to processing on behalf of a runner
///
/// The status is re-read right before the transition so duplicate triggers
/// or two runners racing for the same job do not both start it. This is a
/// re-check, not an atomic claim.
pub async fn claim_job(
    registry: &dyn JobRegistry,
    id: Uuid,
    runner_id: &str,
) -> Result<Job, JobError> {
    let mut job = registry.get(id).await?.ok_or(JobError::NotFound(id))?;

    if job.status != JobStatus::Pending {
        return Err(JobError::InvalidState(format!(
            "Job {} is not pending (current: {})",
            id, job.status
        )));
    }

    job.start(Utc::now())
        .map_err(|e| JobError::InvalidState(e.to_string()))?;
    let job = registry.update(&job).await?;

    tracing::info!(job_id = %id, runner_id = %runner_id, "Job claimed");

    Ok(job)
}

/// Converts a pipeline outcome into the job's terminal state
///
/// This is the only place a [`PipelineResult`] becomes persisted state.
pub async fn complete_job(
    registry: &dyn JobRegistry,
    id: Uuid,
    runner_id: &str,
    result: PipelineResult,
) -> Result<Job, JobError> {
    let mut job = registry.get(id).await?.ok_or(JobError::NotFound(id))?;

    job.finish(result, Utc::now())
        .map_err(|e| JobError::InvalidState(e.to_string()))?;
    let job = registry.update(&job).await?;

    tracing::info!(
        job_id = %id,
        runner_id = %runner_id,
        status = %job.status,
        output = ?job.output_path,
        "Job completed"
    );

    Ok(job)
}

// =============================================================================
// Helper Functions
// =============================================================================

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}
