//! Quill Agent
//!
//! Turns scanned notes into summaries and generated projects.
//!
//! This crate contains:
//! - Rasterizer: PDF pages to PNG images ([`rasterize`])
//! - Prompting client: multimodal completions with a stop reason ([`llm`])
//! - Structured output helpers shared by every JSON-producing phase ([`extract`])
//! - The pipeline engine and its four pipelines ([`engine`], [`pipeline`])

pub mod config;
pub mod engine;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod rasterize;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::EngineConfig;
pub use engine::{PipelineEngine, PipelineError};
pub use llm::{AnthropicClient, Completion, ContentPart, LlmError, PromptingClient, StopReason};
pub use rasterize::{DocumentRasterizer, PdfiumRasterizer, RasterizeError};
