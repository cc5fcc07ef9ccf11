//! Trigger API Handlers
//!
//! Webhook and storage-event entry points. Both run the trigger pipeline
//! synchronously and return the resulting submission.

use axum::{Json, extract::State};
use quill_core::dto::job::JobSubmission;
use quill_core::dto::trigger::{StorageEvent, TriggerResponse, WebhookPayload};

use crate::api::error::{ApiError, ApiResult};
use crate::api::owner::Owner;
use crate::state::AppState;
use crate::trigger::Trigger;

/// POST /trigger
/// Invalid payloads are rejected with 400 instead of being skipped
pub async fn webhook(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(payload): Json<WebhookPayload>,
) -> ApiResult<Json<TriggerResponse>> {
    if !state.trigger_mode.webhooks_enabled() {
        return Err(ApiError::NotFound("Webhook triggers are disabled".to_string()));
    }

    if !state.webhook.should_trigger(&payload).await {
        return Err(ApiError::BadRequest(format!(
            "Invalid trigger payload: '{}' is not a document under '{}/'",
            payload.document_path,
            state.storage.layout().protected_root
        )));
    }

    let job = state
        .dispatcher
        .process(state.webhook.as_ref(), &payload, &owner)
        .await?;

    Ok(Json(TriggerResponse {
        triggered: job.is_some(),
        job: job.as_ref().map(JobSubmission::from),
    }))
}

/// POST /events/storage
/// Object-created notifications; events with no matching record are skipped
pub async fn storage_event(
    State(state): State<AppState>,
    Json(event): Json<StorageEvent>,
) -> ApiResult<Json<TriggerResponse>> {
    if !state.trigger_mode.webhooks_enabled() {
        return Err(ApiError::NotFound("Event triggers are disabled".to_string()));
    }

    let job = state
        .dispatcher
        .process(state.storage_events.as_ref(), &event, &state.trigger_owner)
        .await?;

    Ok(Json(TriggerResponse {
        triggered: job.is_some(),
        job: job.as_ref().map(JobSubmission::from),
    }))
}
