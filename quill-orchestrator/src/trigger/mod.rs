//! Dispatch/Trigger Layer
//!
//! Turns inbound events into job submissions. Every source implements
//! [`Trigger`]; the [`Dispatcher`] composes them as
//! `process(event) = should_trigger ? execute(extract_context(event)) : skip`.
//!
//! Sources:
//! - [`StorageEventTrigger`]: bucket/object-key notifications
//! - [`PollingTrigger`]: periodic scan of the mode folders
//! - [`WebhookTrigger`]: direct payload naming a document
//!
//! No backpressure is applied: every matching event becomes a job.

pub mod event;
pub mod polling;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use quill_core::domain::job::Job;
use quill_core::domain::trigger::TriggerContext;
use quill_core::dto::job::SubmitJob;
use quill_core::layout::{AddressError, DocumentPath, StorageLayout, UnknownTriggerMode};
use thiserror::Error;

use crate::repository::JobRegistry;
use crate::service::job::{self as job_service, JobError};

pub use event::StorageEventTrigger;
pub use polling::PollingTrigger;
pub use webhook::WebhookTrigger;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(transparent)]
    InvalidPath(#[from] AddressError),

    #[error(transparent)]
    UnknownMode(#[from] UnknownTriggerMode),

    #[error("No matching document in event")]
    NoMatch,

    #[error(transparent)]
    Submission(#[from] JobError),
}

impl TriggerError {
    /// Whether retrying the same event can never succeed
    pub fn is_permanent(&self) -> bool {
        match self {
            TriggerError::Submission(JobError::Registry(_)) => false,
            _ => true,
        }
    }
}

/// One source of job-creating events
#[async_trait]
pub trait Trigger: Send + Sync {
    type Event: Send + Sync;

    fn name(&self) -> &'static str;

    /// Cheap filter deciding whether `event` is meant for this system
    async fn should_trigger(&self, event: &Self::Event) -> bool;

    /// Normalizes an accepted event, inferring the job kind from its path
    async fn extract_context(&self, event: &Self::Event) -> Result<TriggerContext, TriggerError>;
}

/// Context for a document path, with the kind taken from its mode folder
///
/// An unrecognized mode folder fails instead of falling back to a default.
pub fn context_from_path(layout: &StorageLayout, path: &str) -> Result<TriggerContext, TriggerError> {
    let document = DocumentPath::parse(layout, path)?;
    let kind = document.kind()?;
    Ok(TriggerContext::new(document.as_str(), kind))
}

/// Shared cheap filter: under the protected root with the document extension
pub(crate) fn is_candidate(layout: &StorageLayout, path: &str) -> bool {
    !path.trim().is_empty()
        && layout.is_protected(path)
        && quill_core::layout::has_document_extension(path)
}

/// Submits trigger contexts through the regular job submission path
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn JobRegistry>,
    layout: StorageLayout,
}

impl Dispatcher {
    pub fn new(registry: Arc<dyn JobRegistry>, layout: StorageLayout) -> Self {
        Self { registry, layout }
    }

    /// Creates the job described by `context`, owned by `owner`
    pub async fn execute(&self, context: TriggerContext, owner: &str) -> Result<Job, TriggerError> {
        tracing::debug!(
            document = %context.document_path,
            kind = %context.kind,
            metadata = ?context.metadata,
            "Dispatching trigger context"
        );

        let submission = SubmitJob {
            kind: context.kind.as_str().to_string(),
            document_path: context.document_path,
            instruction: context.instruction,
            project_ref: context.project_ref,
            project_name: None,
        };
        let job =
            job_service::submit_job(self.registry.as_ref(), &self.layout, owner, submission).await?;
        Ok(job)
    }

    /// Full trigger pipeline; `Ok(None)` when the event was skipped
    pub async fn process<T: Trigger>(
        &self,
        trigger: &T,
        event: &T::Event,
        owner: &str,
    ) -> Result<Option<Job>, TriggerError> {
        if !trigger.should_trigger(event).await {
            tracing::debug!(trigger = trigger.name(), "Event skipped");
            return Ok(None);
        }

        let context = trigger.extract_context(event).await?;
        let job = self.execute(context, owner).await?;

        tracing::info!(trigger = trigger.name(), job_id = %job.id, kind = %job.kind, "Job triggered");
        Ok(Some(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::domain::job::JobKind;

    #[test]
    fn test_context_from_path_infers_kind() {
        let layout = StorageLayout::default();

        let ctx = context_from_path(&layout, "raw/Notes/a.pdf").unwrap();
        assert_eq!(ctx.kind, JobKind::Summarize);

        let ctx = context_from_path(&layout, "raw/create project/idea.pdf").unwrap();
        assert_eq!(ctx.kind, JobKind::CreateProject);

        let ctx = context_from_path(&layout, "RAW/EXISTING_PROJECT/change.pdf").unwrap();
        assert_eq!(ctx.kind, JobKind::ModifyProject);
    }

    #[test]
    fn test_unknown_mode_fails_fast() {
        let layout = StorageLayout::default();
        let err = context_from_path(&layout, "raw/Drafts/a.pdf").unwrap_err();
        assert!(err.to_string().contains("Drafts"), "{err}");
        assert!(err.is_permanent());
    }

    #[test]
    fn test_is_candidate() {
        let layout = StorageLayout::default();
        assert!(is_candidate(&layout, "raw/Notes/a.PDF"));
        assert!(!is_candidate(&layout, "notes/Notes/a.pdf"));
        assert!(!is_candidate(&layout, "raw/Notes/a.txt"));
        assert!(!is_candidate(&layout, ""));
    }
}
