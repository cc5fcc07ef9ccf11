//! Agent pipeline engine
//!
//! Selects the pipeline from the job kind and runs its phases in order.
//! `run` never fails: every error, and any panic inside a phase, ends up as a
//! failed [`PipelineResult`] so the caller can always persist a terminal state.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use quill_core::domain::job::{Job, JobKind, Payload};
use quill_core::domain::pipeline::PipelineResult;
use quill_core::layout::{AddressError, StorageLayout};
use quill_storage::{StorageError, StorageGateway};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::extract::StructuredOutputError;
use crate::llm::{Completion, ContentPart, LlmError, PromptingClient};
use crate::pipeline;
use crate::rasterize::{DocumentRasterizer, RasterizeError};

/// Characters of raw model output kept in a failure payload
const RAW_PREVIEW_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document has no pages")]
    EmptyDocument,

    /// Reported like an empty document; the decoder's reason is appended
    #[error("document has no pages ({0})")]
    DocumentDecode(String),

    #[error("project_id is required for modify_project jobs")]
    MissingProjectRef,

    #[error("failed to parse {phase} output: {source}")]
    StructuredOutput {
        phase: &'static str,
        #[source]
        source: StructuredOutputError,
    },

    #[error("Response truncated - increase max_tokens or simplify request ({})", .source.reason)]
    TruncatedGeneration {
        phase: &'static str,
        source: StructuredOutputError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Rasterize(RasterizeError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

impl From<RasterizeError> for PipelineError {
    fn from(err: RasterizeError) -> Self {
        match err {
            RasterizeError::DocumentDecode(reason) => PipelineError::DocumentDecode(reason),
            other => PipelineError::Rasterize(other),
        }
    }
}

impl PipelineError {
    /// Stable name of the failure class, exposed as `error_kind`
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::EmptyDocument | PipelineError::DocumentDecode(_) => "empty_document",
            PipelineError::MissingProjectRef => "missing_project_ref",
            PipelineError::StructuredOutput { .. } => "structured_output",
            PipelineError::TruncatedGeneration { .. } => "truncated_generation",
            PipelineError::Storage(StorageError::ProtectedPath { .. }) => "protected_path",
            PipelineError::Storage(StorageError::NotFound(_)) => "not_found",
            PipelineError::Storage(_) => "storage",
            PipelineError::Llm(_) => "llm",
            PipelineError::Rasterize(_) => "rasterize",
            PipelineError::Address(_) => "invalid_path",
        }
    }

    fn into_result(self) -> PipelineResult {
        let mut output = Payload::new();
        output.insert("error_kind".into(), Value::from(self.kind()));

        match &self {
            PipelineError::StructuredOutput { phase, source }
            | PipelineError::TruncatedGeneration { phase, source } => {
                output.insert("phase".into(), Value::from(*phase));
                output.insert("parse_error".into(), Value::Bool(true));
                output.insert(
                    "truncated".into(),
                    Value::Bool(matches!(self, PipelineError::TruncatedGeneration { .. })),
                );
                output.insert("raw".into(), Value::from(source.preview(RAW_PREVIEW_CHARS)));
            }
            _ => {}
        }

        PipelineResult::failed_with(self.to_string(), output)
    }
}

/// Runs jobs through their pipeline
///
/// Holds the capabilities every phase needs. Independent jobs may run
/// concurrently on one engine; nothing is shared between runs.
pub struct PipelineEngine {
    storage: Arc<dyn StorageGateway>,
    llm: Arc<dyn PromptingClient>,
    rasterizer: Arc<dyn DocumentRasterizer>,
    config: EngineConfig,
}

impl PipelineEngine {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        llm: Arc<dyn PromptingClient>,
        rasterizer: Arc<dyn DocumentRasterizer>,
    ) -> Self {
        Self {
            storage,
            llm,
            rasterizer,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn layout(&self) -> &StorageLayout {
        self.storage.layout()
    }

    pub(crate) fn storage(&self) -> &dyn StorageGateway {
        self.storage.as_ref()
    }

    /// Executes the pipeline matching `job.kind`
    ///
    /// The job is only borrowed; status changes are the caller's business.
    pub async fn run(&self, job: &Job) -> PipelineResult {
        info!(job_id = %job.id, kind = %job.kind, document = %job.document_path, "Running pipeline");

        let outcome = AssertUnwindSafe(self.dispatch(job)).catch_unwind().await;

        match outcome {
            Ok(Ok(output)) => {
                info!(job_id = %job.id, kind = %job.kind, "Pipeline succeeded");
                PipelineResult::succeeded(output)
            }
            Ok(Err(e)) => {
                warn!(job_id = %job.id, kind = %job.kind, error = %e, "Pipeline failed");
                e.into_result()
            }
            Err(_) => {
                error!(job_id = %job.id, kind = %job.kind, "Pipeline panicked");
                PipelineResult::failed(format!("{} pipeline panicked", job.kind))
            }
        }
    }

    async fn dispatch(&self, job: &Job) -> Result<Payload, PipelineError> {
        match job.kind {
            JobKind::Summarize => pipeline::summarize::run(self, job).await,
            JobKind::CreateProject => pipeline::create_project::run(self, job).await,
            JobKind::ModifyProject => pipeline::modify_project::run(self, job).await,
            JobKind::InferAction => pipeline::infer_action::run(self, job).await,
        }
    }

    // =========================================================================
    // Shared phase helpers
    // =========================================================================

    /// Fetches a document and renders its pages
    ///
    /// Zero pages, or a document that fails to decode, is a terminal failure.
    pub(crate) async fn load_pages(&self, path: &str) -> Result<Vec<Vec<u8>>, PipelineError> {
        let document = self.storage.fetch(path).await?;

        let rasterizer = Arc::clone(&self.rasterizer);
        let dpi = self.config.dpi;
        let pages = tokio::task::spawn_blocking(move || rasterizer.rasterize(&document, dpi))
            .await
            .map_err(|e| {
                PipelineError::Rasterize(RasterizeError::Render {
                    page: 0,
                    reason: format!("rasterizer task failed: {}", e),
                })
            })??;

        if pages.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }

        debug!(path = %path, pages = pages.len(), "Document rasterized");
        Ok(pages)
    }

    /// Page images followed by one text instruction
    pub(crate) fn vision_prompt(pages: &[Vec<u8>], text: String) -> Vec<ContentPart> {
        pages
            .iter()
            .map(|page| ContentPart::png(page.clone()))
            .chain(std::iter::once(ContentPart::Text(text)))
            .collect()
    }

    pub(crate) async fn complete(
        &self,
        content: &[ContentPart],
        max_tokens: u32,
        stream: bool,
    ) -> Result<Completion, PipelineError> {
        let completion = self.llm.complete(content, max_tokens, stream).await?;
        debug!(
            chars = completion.text.len(),
            stop_reason = ?completion.stop_reason,
            "Completion received"
        );
        Ok(completion)
    }

    pub(crate) async fn complete_text(
        &self,
        prompt: String,
        max_tokens: u32,
    ) -> Result<Completion, PipelineError> {
        self.complete(&[ContentPart::Text(prompt)], max_tokens, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedPages, ScriptedClient};
    use quill_storage::MemoryStorage;

    #[tokio::test]
    async fn test_panicking_phase_becomes_failed_result() {
        struct PanickingRasterizer;
        impl DocumentRasterizer for PanickingRasterizer {
            fn rasterize(&self, _: &[u8], _: u32) -> Result<Vec<Vec<u8>>, RasterizeError> {
                panic!("boom");
            }
        }

        let storage = Arc::new(MemoryStorage::new());
        storage
            .upload_to_protected_zone("Notes/a.pdf", b"%PDF", "application/pdf")
            .await
            .unwrap();
        let engine = PipelineEngine::new(
            storage,
            Arc::new(ScriptedClient::new()),
            Arc::new(PanickingRasterizer),
        );

        let job = Job::new(JobKind::Summarize, "raw/Notes/a.pdf");
        let result = engine.run(&job).await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_missing_document_is_reported() {
        let engine = PipelineEngine::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(ScriptedClient::new()),
            Arc::new(FixedPages::new(1)),
        );

        let job = Job::new(JobKind::Summarize, "raw/Notes/missing.pdf");
        let result = engine.run(&job).await;
        assert!(!result.success);
        assert_eq!(result.output["error_kind"], "not_found");
    }

    #[test]
    fn test_truncated_error_payload() {
        let err = PipelineError::TruncatedGeneration {
            phase: "infer_action",
            source: StructuredOutputError {
                reason: "EOF while parsing".into(),
                raw: "{\"files\": [".into(),
            },
        };
        assert!(err.to_string().starts_with("Response truncated"));

        let result = err.into_result();
        assert_eq!(result.output["error_kind"], "truncated_generation");
        assert_eq!(result.output["truncated"], true);
        assert_eq!(result.output["raw"], "{\"files\": [");
    }
}
