//! Trigger endpoints

use quill_core::dto::trigger::{TriggerResponse, WebhookPayload};

use crate::OrchestratorClient;
use crate::error::Result;

impl OrchestratorClient {
    /// Fire the webhook trigger for one document
    ///
    /// The job kind is inferred by the orchestrator from the document's
    /// mode folder.
    pub async fn trigger(&self, payload: WebhookPayload) -> Result<TriggerResponse> {
        let request = self.owned(self.client.post(self.url("/trigger")))?;
        let response = request.json(&payload).send().await?;

        self.handle_response(response).await
    }
}
