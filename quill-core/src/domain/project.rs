//! Project domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::Payload;

/// Registered project
///
/// `id` is the folder name under the projects root. The owner is kept by
/// the registry next to the record, like it is for jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub framework: String,
    /// Job whose output created the project, if any
    pub source_job_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Payload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            language: String::new(),
            framework: String::new(),
            source_job_id: None,
            metadata: Payload::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_source_job(mut self, job_id: Uuid) -> Self {
        self.source_job_id = Some(job_id);
        self
    }

    /// Applies the fields set on `changes` and stamps `updated_at`
    ///
    /// Returns false when `changes` carries nothing to apply.
    pub fn apply(&mut self, changes: ProjectChanges, now: DateTime<Utc>) -> bool {
        if changes.is_empty() {
            return false;
        }
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(language) = changes.language {
            self.language = language;
        }
        if let Some(framework) = changes.framework {
            self.framework = framework;
        }
        if let Some(metadata) = changes.metadata {
            self.metadata = metadata;
        }
        self.updated_at = now;
        true
    }
}

/// Editable project fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Payload>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.language.is_none()
            && self.framework.is_none()
            && self.metadata.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_only_touches_given_fields() {
        let mut project = Project::new("todo_app", "todo app");
        project.language = "python".into();
        let created = project.updated_at;

        let later = created + chrono::Duration::seconds(5);
        let applied = project.apply(
            ProjectChanges {
                description: Some("Tracks chores".into()),
                ..ProjectChanges::default()
            },
            later,
        );

        assert!(applied);
        assert_eq!(project.description, "Tracks chores");
        assert_eq!(project.language, "python");
        assert_eq!(project.updated_at, later);
        assert_eq!(project.created_at, created);
    }

    #[test]
    fn test_empty_changes_are_rejected() {
        let mut project = Project::new("a", "a");
        let before = project.clone();
        assert!(!project.apply(ProjectChanges::default(), Utc::now()));
        assert_eq!(project, before);
    }

    #[test]
    fn test_changes_ignore_unknown_fields() {
        let changes: ProjectChanges =
            serde_json::from_str(r#"{"id": "other", "owner": "mallory"}"#).unwrap();
        assert!(changes.is_empty());
    }
}
