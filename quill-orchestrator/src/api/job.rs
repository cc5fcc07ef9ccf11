//! Job API Handlers
//!
//! Submission and status endpoints for users, plus the claim/complete
//! protocol used by runners.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use quill_core::domain::job::Job;
use quill_core::dto::job::{ClaimJob, CompleteJob, ExecuteRequest, JobSubmission, JobSummary, SubmitJob};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::owner::Owner;
use crate::service::{job_service, project_service};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

// =============================================================================
// User Endpoints
// =============================================================================

/// POST /jobs
/// Validate and enqueue a job for the caller
pub async fn submit_job(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<SubmitJob>,
) -> ApiResult<(StatusCode, Json<JobSubmission>)> {
    tracing::info!("Submitting {} job for {}", req.kind, req.document_path);

    let job = job_service::submit_job(
        state.registry.as_ref(),
        state.storage.layout(),
        &owner,
        req,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(JobSubmission::from(&job))))
}

/// POST /execute
/// Enqueue an infer-action job
pub async fn execute(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<ExecuteRequest>,
) -> ApiResult<(StatusCode, Json<JobSubmission>)> {
    tracing::info!("Submitting infer_action job for {}", req.document_path);

    let job = job_service::submit_execute(
        state.registry.as_ref(),
        state.storage.layout(),
        &owner,
        req,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(JobSubmission::from(&job))))
}

/// GET /jobs/{id}
/// Full job record, readable by its creator only
pub async fn get_job(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job_for_owner(state.registry.as_ref(), id, &owner).await?;
    Ok(Json(job))
}

/// GET /jobs
/// The caller's jobs, most recent first
pub async fn list_jobs(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    tracing::debug!("Listing jobs for {}", owner);

    let jobs = job_service::list_jobs(state.registry.as_ref(), &owner, params.limit).await?;
    Ok(Json(jobs))
}

// =============================================================================
// Runner Endpoints
// =============================================================================

/// GET /jobs/scheduled
/// Pending jobs, oldest first
pub async fn list_scheduled_jobs(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    let jobs = job_service::list_scheduled_jobs(state.registry.as_ref(), params.limit).await?;
    Ok(Json(jobs))
}

/// GET /jobs/recent
/// Latest jobs across all owners, newest first
pub async fn list_recent_jobs(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    let jobs = job_service::list_recent_jobs(state.registry.as_ref(), params.limit).await?;
    Ok(Json(jobs))
}

/// POST /jobs/{id}/claim
/// Move a pending job to processing; 409 if it is no longer pending
pub async fn claim_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClaimJob>,
) -> ApiResult<Json<Job>> {
    tracing::info!("Runner {} claiming job: {}", req.runner_id, id);

    let job = job_service::claim_job(state.registry.as_ref(), id, &req.runner_id).await?;
    Ok(Json(job))
}

/// POST /jobs/{id}/complete
/// Record the pipeline outcome as the job's terminal state
pub async fn complete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteJob>,
) -> ApiResult<Json<Job>> {
    tracing::info!(
        "Runner {} completing job: {} (success: {})",
        req.runner_id,
        id,
        req.result.success
    );

    let job =
        job_service::complete_job(state.registry.as_ref(), id, &req.runner_id, req.result).await?;

    // Project bookkeeping never fails the completion itself
    match state.registry.get_with_owner(id).await {
        Ok(Some((_, owner))) => {
            if let Err(e) = project_service::record_job_project(
                state.projects.as_ref(),
                state.storage.layout(),
                &owner,
                &job,
            )
            .await
            {
                tracing::warn!(job_id = %id, error = %e, "Failed to register job project");
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(job_id = %id, error = %e, "Failed to read job owner"),
    }

    Ok(Json(job))
}
