//! Webhook trigger
//!
//! Called directly, typically right after an upload, with the document path
//! and the optional instruction and project reference.

use async_trait::async_trait;
use quill_core::domain::trigger::TriggerContext;
use quill_core::dto::trigger::WebhookPayload;
use quill_core::layout::StorageLayout;

use super::{Trigger, TriggerError, context_from_path, is_candidate};

pub struct WebhookTrigger {
    layout: StorageLayout,
}

impl WebhookTrigger {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl Trigger for WebhookTrigger {
    type Event = WebhookPayload;

    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn should_trigger(&self, payload: &WebhookPayload) -> bool {
        is_candidate(&self.layout, &payload.document_path)
    }

    async fn extract_context(&self, payload: &WebhookPayload) -> Result<TriggerContext, TriggerError> {
        let mut context = context_from_path(&self.layout, &payload.document_path)?;
        context.instruction = payload.instruction.clone().filter(|s| !s.trim().is_empty());
        context.project_ref = payload.project_ref.clone().filter(|s| !s.trim().is_empty());
        context.metadata = payload.metadata.clone();
        Ok(context)
    }
}
