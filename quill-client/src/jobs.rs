//! Job-related API endpoints

use quill_core::domain::job::Job;
use quill_core::domain::pipeline::PipelineResult;
use quill_core::dto::job::{ClaimJob, CompleteJob, ExecuteRequest, JobSubmission, JobSummary, SubmitJob};
use uuid::Uuid;

use crate::OrchestratorClient;
use crate::error::Result;

impl OrchestratorClient {
    // =============================================================================
    // User Endpoints
    // =============================================================================

    /// Submit a job for the configured owner
    ///
    /// # Arguments
    /// * `req` - Kind, document path and optional instruction/project fields
    pub async fn submit_job(&self, req: SubmitJob) -> Result<JobSubmission> {
        let request = self.owned(self.client.post(self.url("/jobs")))?;
        let response = request.json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Queue an infer-action run on one document
    pub async fn execute(&self, req: ExecuteRequest) -> Result<JobSubmission> {
        let request = self.owned(self.client.post(self.url("/execute")))?;
        let response = request.json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Get a job by ID; only its creator may read it
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let request = self.owned(self.client.get(self.url(&format!("/jobs/{}", job_id))))?;
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// The owner's jobs, most recent first
    ///
    /// # Arguments
    /// * `limit` - Maximum number of jobs; the server default applies when `None`
    pub async fn list_jobs(&self, limit: Option<usize>) -> Result<Vec<JobSummary>> {
        let mut request = self.owned(self.client.get(self.url("/jobs")))?;
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Runner Endpoints
    // =============================================================================

    /// Pending jobs, oldest first
    pub async fn list_scheduled_jobs(&self, limit: Option<usize>) -> Result<Vec<Job>> {
        let mut request = self.client.get(self.url("/jobs/scheduled"));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Claim a pending job; fails with status 409 if another runner got it first
    ///
    /// # Arguments
    /// * `job_id` - The job to claim
    /// * `runner_id` - The runner taking it
    pub async fn claim_job(&self, job_id: Uuid, runner_id: &str) -> Result<Job> {
        let url = self.url(&format!("/jobs/{}/claim", job_id));
        let response = self
            .client
            .post(&url)
            .json(&ClaimJob {
                runner_id: runner_id.to_string(),
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Report the pipeline outcome of a claimed job
    pub async fn complete_job(
        &self,
        job_id: Uuid,
        runner_id: &str,
        result: PipelineResult,
    ) -> Result<Job> {
        let url = self.url(&format!("/jobs/{}/complete", job_id));
        tracing::debug!("Completing job {} (success: {})", job_id, result.success);

        let response = self
            .client
            .post(&url)
            .json(&CompleteJob {
                runner_id: runner_id.to_string(),
                result,
            })
            .send()
            .await?;

        self.handle_response(response).await
    }
}
