//! Trigger domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::job::{Job, JobKind};

/// Normalized description of one triggering event
///
/// Derived from a storage path or a webhook payload. Never persisted on its
/// own; it only exists to produce a [`Job`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    pub document_path: String,
    pub kind: JobKind,
    pub instruction: Option<String>,
    pub project_ref: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub triggered_at: DateTime<Utc>,
}

impl TriggerContext {
    pub fn new(document_path: impl Into<String>, kind: JobKind) -> Self {
        Self {
            document_path: document_path.into(),
            kind,
            instruction: None,
            project_ref: None,
            metadata: HashMap::new(),
            triggered_at: Utc::now(),
        }
    }

    /// Builds the pending job this trigger stands for
    pub fn to_job(&self) -> Job {
        Job::new(self.kind, self.document_path.clone())
            .with_instruction(self.instruction.clone())
            .with_project_ref(self.project_ref.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobStatus;

    #[test]
    fn test_to_job_carries_fields() {
        let mut ctx = TriggerContext::new("raw/Existing_Project/change.pdf", JobKind::ModifyProject);
        ctx.instruction = Some("add tests".into());
        ctx.project_ref = Some("todo-app".into());

        let job = ctx.to_job();
        assert_eq!(job.kind, JobKind::ModifyProject);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.document_path, "raw/Existing_Project/change.pdf");
        assert_eq!(job.instruction.as_deref(), Some("add tests"));
        assert_eq!(job.project_ref.as_deref(), Some("todo-app"));
    }
}
