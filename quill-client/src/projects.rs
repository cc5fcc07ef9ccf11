//! Project registry and browser endpoints

use quill_core::domain::project::{Project, ProjectChanges};
use quill_core::dto::project::{
    CreateProject, ProjectDeleted, ProjectDetail, ProjectFiles, ProjectList,
};

use crate::OrchestratorClient;
use crate::error::Result;

impl OrchestratorClient {
    /// The owner's projects, optionally filtered by a search term
    pub async fn list_projects(&self, search: Option<&str>) -> Result<ProjectList> {
        let mut request = self.owned(self.client.get(self.url("/projects")))?;
        if let Some(search) = search {
            request = request.query(&[("search", search)]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Register a project for the owner
    pub async fn create_project(&self, req: CreateProject) -> Result<Project> {
        let request = self.owned(self.client.post(self.url("/projects")))?;
        let response = request.json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<ProjectDetail> {
        let url = self.url(&format!("/projects/{}", project_id));
        let response = self.owned(self.client.get(&url))?.send().await?;

        self.handle_response(response).await
    }

    pub async fn update_project(&self, project_id: &str, changes: ProjectChanges) -> Result<Project> {
        let url = self.url(&format!("/projects/{}", project_id));
        let response = self.owned(self.client.put(&url))?.json(&changes).send().await?;

        self.handle_response(response).await
    }

    /// Remove the project record; its files stay in storage
    pub async fn delete_project(&self, project_id: &str) -> Result<ProjectDeleted> {
        let url = self.url(&format!("/projects/{}", project_id));
        let response = self.owned(self.client.delete(&url))?.send().await?;

        self.handle_response(response).await
    }

    /// Files of one of the owner's projects
    pub async fn project_files(&self, project_id: &str) -> Result<ProjectFiles> {
        let url = self.url(&format!("/projects/{}/files", project_id));
        let response = self.owned(self.client.get(&url))?.send().await?;

        self.handle_response(response).await
    }
}
