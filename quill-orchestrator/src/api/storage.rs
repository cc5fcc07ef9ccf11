//! Storage API Handlers
//!
//! Document upload into the protected root.

use axum::{Json, extract::State, http::StatusCode};
use quill_core::dto::storage::{UploadRequest, UploadResponse};

use crate::api::error::ApiResult;
use crate::api::owner::Owner;
use crate::service::storage_service;
use crate::state::AppState;

/// POST /upload
/// Place a base64-encoded document under the protected root
pub async fn upload(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<UploadRequest>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    tracing::info!("Upload of {} by {}", req.path, owner);

    let response = storage_service::upload_document(state.storage.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
