//! Jobs repository
//!
//! Handles communication with the orchestrator for job-related operations:
//! - Fetching scheduled jobs
//! - Claiming jobs
//! - Completing jobs with the pipeline result

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use quill_client::OrchestratorClient;
use quill_core::domain::job::Job;
use quill_core::domain::pipeline::PipelineResult;
use uuid::Uuid;

/// Repository trait for job-related operations with the orchestrator
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Pending jobs, oldest first, at most `limit`
    async fn fetch_scheduled_jobs(&self, limit: usize) -> Result<Vec<Job>>;

    /// Claims a job for execution
    ///
    /// Returns `None` when the job is no longer pending, i.e. another
    /// runner claimed it between the listing and this call.
    async fn claim_job(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Reports the pipeline outcome, moving the job to its terminal state
    async fn complete_job(&self, job_id: Uuid, result: PipelineResult) -> Result<()>;
}

/// HTTP implementation of JobRepository
pub struct HttpJobRepository {
    client: Arc<OrchestratorClient>,
    runner_id: String,
}

impl HttpJobRepository {
    /// Creates a new HTTP job repository
    ///
    /// # Arguments
    /// * `client` - Orchestrator client
    /// * `runner_id` - Identity reported on claim and complete
    pub fn new(client: Arc<OrchestratorClient>, runner_id: impl Into<String>) -> Self {
        Self {
            client,
            runner_id: runner_id.into(),
        }
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn fetch_scheduled_jobs(&self, limit: usize) -> Result<Vec<Job>> {
        self.client
            .list_scheduled_jobs(Some(limit))
            .await
            .context("Failed to fetch scheduled jobs")
    }

    async fn claim_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        match self.client.claim_job(job_id, &self.runner_id).await {
            Ok(job) => Ok(Some(job)),
            Err(e) if e.is_conflict() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to claim job {}", job_id)),
        }
    }

    async fn complete_job(&self, job_id: Uuid, result: PipelineResult) -> Result<()> {
        self.client
            .complete_job(job_id, &self.runner_id, result)
            .await
            .with_context(|| format!("Failed to complete job {}", job_id))?;
        Ok(())
    }
}
