//! Test doubles for the engine's capabilities

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quill_storage::{MemoryStorage, StorageGateway};

use crate::llm::{Completion, ContentPart, LlmError, PromptingClient, StopReason};
use crate::rasterize::{DocumentRasterizer, RasterizeError};

/// Document bytes that [`FixedPages`] refuses to decode
pub const CORRUPT_DOCUMENT: &[u8] = b"not a pdf";

/// Minimal valid 1x1 PNG
pub fn minimal_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
        0xCF, 0xC0, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0xE2, 0x21, 0xBC, 0x33, 0x00, 0x00, 0x00,
        0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

/// In-memory storage holding one uploaded document
///
/// `path` is relative to the protected root, e.g. `Notes/x.pdf`.
pub async fn storage_with_document(path: &str, content: &[u8]) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    if let Err(e) = storage
        .upload_to_protected_zone(path, content, "application/pdf")
        .await
    {
        panic!("failed to seed {path}: {e}");
    }
    storage
}

/// Rasterizer returning the same number of pages for any non-empty document
pub struct FixedPages {
    pages: usize,
}

impl FixedPages {
    pub fn new(pages: usize) -> Self {
        Self { pages }
    }
}

impl DocumentRasterizer for FixedPages {
    fn rasterize(&self, document: &[u8], _dpi: u32) -> Result<Vec<Vec<u8>>, RasterizeError> {
        if document.is_empty() {
            return Ok(Vec::new());
        }
        if document == CORRUPT_DOCUMENT {
            return Err(RasterizeError::DocumentDecode("failed to load PDF: bad header".into()));
        }
        Ok((0..self.pages).map(|_| minimal_png()).collect())
    }
}

/// One prompt as seen by [`ScriptedClient`]
#[derive(Debug, Clone)]
pub struct RecordedPrompt {
    pub images: usize,
    pub text: String,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Prompting client replaying canned completions in order
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Completion>>,
    prompts: Mutex<Vec<RecordedPrompt>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a natural completion
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.reply_with(text, StopReason::EndTurn)
    }

    pub fn reply_with(self, text: impl Into<String>, stop_reason: StopReason) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(Completion {
                text: text.into(),
                stop_reason,
            });
        }
        self
    }

    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl PromptingClient for ScriptedClient {
    async fn complete(
        &self,
        content: &[ContentPart],
        max_tokens: u32,
        stream: bool,
    ) -> Result<Completion, LlmError> {
        let images = content
            .iter()
            .filter(|p| matches!(p, ContentPart::Image { .. }))
            .count();
        let text = content
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(RecordedPrompt {
                images,
                text,
                max_tokens,
                stream,
            });
        }

        self.responses
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .ok_or_else(|| LlmError::InvalidResponse("no scripted response left".into()))
    }
}
