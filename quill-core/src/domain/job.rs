//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::pipeline::PipelineResult;

/// Open, kind-specific result payload
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Unit of work tracked by the job registry
///
/// Structure shared between orchestrator (persists) and runner (updates).
/// Status changes go through [`Job::start`], [`Job::complete`] and [`Job::fail`]
/// so the lifecycle stays monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub document_path: String,
    pub instruction: Option<String>,
    /// Existing project folder, required for [`JobKind::ModifyProject`]
    pub project_ref: Option<String>,
    /// Target project display name, used by [`JobKind::InferAction`]
    pub project_name: Option<String>,
    pub output_path: Option<String>,
    pub result: Option<Payload>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a new pending job
    pub fn new(kind: JobKind, document_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: JobStatus::Pending,
            document_path: document_path.into(),
            instruction: None,
            project_ref: None,
            project_name: None,
            output_path: None,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_instruction(mut self, instruction: Option<String>) -> Self {
        self.instruction = instruction.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_project_ref(mut self, project_ref: Option<String>) -> Self {
        self.project_ref = project_ref.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_project_name(mut self, project_name: Option<String>) -> Self {
        self.project_name = project_name.filter(|s| !s.trim().is_empty());
        self
    }

    /// Moves a pending job to processing and stamps `started_at`
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Processing)?;
        self.started_at.get_or_insert(now);
        Ok(())
    }

    /// Marks a processing job as completed with its output
    pub fn complete(
        &mut self,
        output_path: Option<String>,
        result: Payload,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.transition(JobStatus::Completed)?;
        self.output_path = output_path;
        self.result = Some(result);
        self.completed_at = Some(now);
        Ok(())
    }

    /// Marks a job as failed
    ///
    /// A job may fail straight from pending (e.g. it could not be started);
    /// `started_at` is then stamped together with `completed_at`.
    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.started_at.get_or_insert(now);
        self.error = Some(error.into());
        self.completed_at = Some(now);
        Ok(())
    }

    /// Converts a pipeline outcome into the terminal state
    ///
    /// The output location is taken from the payload's `output_path`,
    /// falling back to `project_path`.
    pub fn finish(&mut self, result: PipelineResult, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if result.success {
            let output_path = result.output_location();
            self.complete(output_path, result.output, now)
        } else {
            let error = result
                .error
                .unwrap_or_else(|| "pipeline failed without an error message".to_string());
            self.fail(error, now)
        }
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                job_id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Pipeline variant a job runs through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Summarize,
    CreateProject,
    ModifyProject,
    InferAction,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::Summarize,
        JobKind::CreateProject,
        JobKind::ModifyProject,
        JobKind::InferAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Summarize => "summarize",
            JobKind::CreateProject => "create_project",
            JobKind::ModifyProject => "modify_project",
            JobKind::InferAction => "infer_action",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = UnknownJobKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownJobKind(s.to_string()))
    }
}

/// Error returned when a job kind string is not part of the closed set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job kind '{0}', expected one of: summarize, create_project, modify_project, infer_action")]
pub struct UnknownJobKind(pub String);

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `to`
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        matches!(
            (self, to),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {job_id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub job_id: Uuid,
    pub from: JobStatus,
    pub to: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_job_kind_parsing() {
        assert_eq!("summarize".parse::<JobKind>().unwrap(), JobKind::Summarize);
        assert_eq!(
            "create-project".parse::<JobKind>().unwrap(),
            JobKind::CreateProject
        );
        assert_eq!(
            " Modify_Project ".parse::<JobKind>().unwrap(),
            JobKind::ModifyProject
        );
        assert!("translate".parse::<JobKind>().is_err());
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut job = Job::new(JobKind::Summarize, "raw/Notes/a.pdf");
        let t0 = job.created_at;

        job.start(t0 + Duration::seconds(1)).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.completed_at.is_none());

        let mut payload = Payload::new();
        payload.insert("output_path".into(), "notes/Notes/a.md".into());
        job.complete(Some("notes/Notes/a.md".into()), payload, t0 + Duration::seconds(5))
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.started_at.unwrap() <= job.completed_at.unwrap());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_started_at_set_once() {
        let mut job = Job::new(JobKind::Summarize, "raw/Notes/a.pdf");
        let first = job.created_at + Duration::seconds(1);
        job.start(first).unwrap();
        assert!(job.start(first + Duration::seconds(1)).is_err());
        assert_eq!(job.started_at, Some(first));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = Job::new(JobKind::CreateProject, "raw/Create_Project/a.pdf");
        let now = Utc::now();
        job.start(now).unwrap();
        job.fail("boom", now).unwrap();

        assert!(job.start(now).is_err());
        assert!(job.complete(None, Payload::new(), now).is_err());
        assert!(job.fail("again", now).is_err());
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.result.is_none());
    }

    #[test]
    fn test_complete_requires_processing() {
        let mut job = Job::new(JobKind::Summarize, "raw/Notes/a.pdf");
        let err = job.complete(None, Payload::new(), Utc::now()).unwrap_err();
        assert_eq!(err.from, JobStatus::Pending);
        assert_eq!(err.to, JobStatus::Completed);
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_fail_from_pending_stamps_both_timestamps() {
        let mut job = Job::new(JobKind::Summarize, "raw/Notes/a.pdf");
        let now = Utc::now();
        job.fail("could not start", now).unwrap();
        assert_eq!(job.started_at, Some(now));
        assert_eq!(job.completed_at, Some(now));
    }

    #[test]
    fn test_finish_uses_project_path_fallback() {
        let mut job = Job::new(JobKind::CreateProject, "raw/Create_Project/a.pdf");
        let now = Utc::now();
        job.start(now).unwrap();

        let mut output = Payload::new();
        output.insert("project_path".into(), "projects/todo".into());
        job.finish(PipelineResult::succeeded(output), now).unwrap();

        assert_eq!(job.output_path.as_deref(), Some("projects/todo"));
    }

    #[test]
    fn test_blank_optional_fields_are_dropped() {
        let job = Job::new(JobKind::ModifyProject, "raw/Existing_Project/a.pdf")
            .with_instruction(Some("   ".into()))
            .with_project_ref(Some("".into()));
        assert!(job.instruction.is_none());
        assert!(job.project_ref.is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let kind = serde_json::to_string(&JobKind::InferAction).unwrap();
        assert_eq!(kind, "\"infer_action\"");
    }
}
