//! Job DTOs for inter-service communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{Job, JobKind, JobStatus};
use crate::domain::pipeline::PipelineResult;

/// Request to submit a new job
///
/// `kind` stays a plain string so an unknown value is reported by the
/// service with the list of accepted kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJob {
    pub kind: String,
    pub document_path: String,
    #[serde(default)]
    pub instruction: Option<String>,
    /// Existing project folder, required for `modify_project`
    #[serde(default)]
    pub project_ref: Option<String>,
    /// Target project name, used by `infer_action`
    #[serde(default)]
    pub project_name: Option<String>,
}

/// Request to run the infer-action pipeline on one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub document_path: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
}

/// Returned when a job is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub document_path: String,
}

impl From<&Job> for JobSubmission {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            kind: job.kind,
            status: job.status,
            document_path: job.document_path.clone(),
        }
    }
}

/// Abbreviated job record used by list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub document_path: String,
    pub created_at: DateTime<Utc>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            status: job.status,
            document_path: job.document_path,
            created_at: job.created_at,
        }
    }
}

/// Runner request to take ownership of a pending job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimJob {
    pub runner_id: String,
}

/// Runner report of a finished pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteJob {
    pub runner_id: String,
    pub result: PipelineResult,
}
