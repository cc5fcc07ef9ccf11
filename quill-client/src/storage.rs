//! Document upload endpoint

use quill_core::dto::storage::{UploadRequest, UploadResponse};

use crate::OrchestratorClient;
use crate::error::Result;

impl OrchestratorClient {
    /// Upload a document into the protected input root
    pub async fn upload(&self, req: UploadRequest) -> Result<UploadResponse> {
        let request = self.owned(self.client.post(self.url("/upload")))?;
        let response = request.json(&req).send().await?;

        self.handle_response(response).await
    }
}
