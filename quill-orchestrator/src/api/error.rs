//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quill_storage::StorageError;

use crate::repository::{ProjectRegistryError, RegistryError};
use crate::service::job::JobError;
use crate::service::project::ProjectError;
use crate::service::storage::UploadError;
use crate::trigger::TriggerError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    Registry(RegistryError),
    ProjectRegistry(ProjectRegistryError),
    Storage(StorageError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Registry(err) => {
                tracing::error!("Registry error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::ProjectRegistry(err) => {
                tracing::error!("Project registry error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Storage(err) => {
                tracing::error!("Storage error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::InvalidKind(_) | JobError::InvalidPath(_) | JobError::MissingProjectRef => {
                ApiError::BadRequest(err.to_string())
            }
            JobError::NotFound(_) => ApiError::NotFound(err.to_string()),
            JobError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            JobError::InvalidState(msg) => ApiError::Conflict(msg),
            JobError::Registry(err) => ApiError::Registry(err),
        }
    }
}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::InvalidName(_) | ProjectError::NoChanges => {
                ApiError::BadRequest(err.to_string())
            }
            ProjectError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ProjectError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            ProjectError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            ProjectError::Registry(err) => ApiError::ProjectRegistry(err),
            ProjectError::Storage(err) => err.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StorageError::ProtectedPath { .. } => ApiError::Forbidden(err.to_string()),
            StorageError::InvalidPath(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Storage(other),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidContent(_) | UploadError::NotADocument(_) => {
                ApiError::BadRequest(err.to_string())
            }
            UploadError::Storage(err) => err.into(),
        }
    }
}

impl From<TriggerError> for ApiError {
    fn from(err: TriggerError) -> Self {
        match err {
            TriggerError::InvalidPath(_) | TriggerError::UnknownMode(_) | TriggerError::NoMatch => {
                ApiError::BadRequest(err.to_string())
            }
            TriggerError::Submission(err) => err.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
