//! In-memory Job and Project Registries
//!
//! Used when no database is configured and by tests. Contents are lost on
//! restart.

use std::collections::HashMap;

use async_trait::async_trait;
use quill_core::domain::job::{Job, JobStatus};
use quill_core::domain::project::Project;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::job::{JobRegistry, RegistryError, merge_job};
use super::project::{ProjectRegistry, ProjectRegistryError};

#[derive(Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<Uuid, (Job, String)>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect<F>(&self, filter: F) -> Vec<Job>
    where
        F: Fn(&Job, &str) -> bool,
    {
        self.jobs
            .read()
            .await
            .values()
            .filter(|(job, owner)| filter(job, owner))
            .map(|(job, _)| job.clone())
            .collect()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn create(&self, job: Job, owner: &str) -> Result<Job, RegistryError> {
        self.jobs
            .write()
            .await
            .insert(job.id, (job.clone(), owner.to_string()));
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, RegistryError> {
        Ok(self.jobs.read().await.get(&id).map(|(job, _)| job.clone()))
    }

    async fn get_with_owner(&self, id: Uuid) -> Result<Option<(Job, String)>, RegistryError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update(&self, job: &Job) -> Result<Job, RegistryError> {
        let mut jobs = self.jobs.write().await;
        let (stored, _) = jobs.get_mut(&job.id).ok_or(RegistryError::NotFound(job.id))?;
        merge_job(stored, job);
        Ok(stored.clone())
    }

    async fn list_by_owner(&self, owner: &str, limit: usize) -> Result<Vec<Job>, RegistryError> {
        let mut jobs = self.collect(|_, o| o == owner).await;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Job>, RegistryError> {
        let mut jobs = self.collect(|_, _| true).await;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn list_by_status(&self, status: JobStatus, limit: usize) -> Result<Vec<Job>, RegistryError> {
        let mut jobs = self.collect(|job, _| job.status == status).await;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }
}

#[derive(Default)]
pub struct InMemoryProjectRegistry {
    projects: RwLock<HashMap<String, (Project, String)>>,
}

impl InMemoryProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRegistry for InMemoryProjectRegistry {
    async fn create(&self, project: Project, owner: &str) -> Result<Project, ProjectRegistryError> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(&project.id) {
            return Err(ProjectRegistryError::AlreadyExists(project.id));
        }
        projects.insert(project.id.clone(), (project.clone(), owner.to_string()));
        Ok(project)
    }

    async fn get_with_owner(&self, id: &str) -> Result<Option<(Project, String)>, ProjectRegistryError> {
        Ok(self.projects.read().await.get(id).cloned())
    }

    async fn update(&self, project: &Project) -> Result<Project, ProjectRegistryError> {
        let mut projects = self.projects.write().await;
        let (stored, _) = projects
            .get_mut(&project.id)
            .ok_or_else(|| ProjectRegistryError::NotFound(project.id.clone()))?;
        // Identity and provenance are fixed at creation
        let created_at = stored.created_at;
        let source_job_id = stored.source_job_id;
        *stored = Project {
            created_at,
            source_job_id,
            ..project.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool, ProjectRegistryError> {
        Ok(self.projects.write().await.remove(id).is_some())
    }

    async fn list_by_owner(&self, owner: &str, limit: usize) -> Result<Vec<Project>, ProjectRegistryError> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|(_, o)| o == owner)
            .map(|(project, _)| project.clone())
            .collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        projects.truncate(limit);
        Ok(projects)
    }
}
