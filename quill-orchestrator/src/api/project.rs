//! Project API Handlers
//!
//! Owner-scoped project registry and browser. Every endpoint answers 403
//! for a project registered to another caller.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use quill_core::domain::project::{Project, ProjectChanges};
use quill_core::dto::project::{
    CreateProject, ProjectDeleted, ProjectDetail, ProjectFiles, ProjectList,
};
use serde::Deserialize;

use crate::api::error::ApiResult;
use crate::api::owner::Owner;
use crate::service::project_service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub search: Option<String>,
}

/// GET /projects
pub async fn list_projects(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(params): Query<ProjectQuery>,
) -> ApiResult<Json<ProjectList>> {
    let projects = project_service::list_projects(
        state.projects.as_ref(),
        state.storage.as_ref(),
        &owner,
        params.search.as_deref(),
    )
    .await?;
    Ok(Json(ProjectList { projects }))
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Json(req): Json<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    tracing::info!("Registering project {} for {}", req.name, owner);

    let project = project_service::create_project(state.projects.as_ref(), &owner, req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectDetail>> {
    let detail =
        project_service::get_project(state.projects.as_ref(), state.storage.as_ref(), &owner, &id)
            .await?;
    Ok(Json(detail))
}

/// PUT /projects/{id}
/// Edit name, description, language, framework or metadata
pub async fn update_project(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(changes): Json<ProjectChanges>,
) -> ApiResult<Json<Project>> {
    let project =
        project_service::update_project(state.projects.as_ref(), &owner, &id, changes).await?;
    Ok(Json(project))
}

/// DELETE /projects/{id}
/// Removes the record only, generated files are kept
pub async fn delete_project(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectDeleted>> {
    let project_id = project_service::delete_project(state.projects.as_ref(), &owner, &id).await?;
    Ok(Json(ProjectDeleted {
        deleted: true,
        project_id,
    }))
}

/// GET /projects/{id}/files
pub async fn project_files(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectFiles>> {
    let files =
        project_service::project_files(state.projects.as_ref(), state.storage.as_ref(), &owner, &id)
            .await?;
    Ok(Json(files))
}
