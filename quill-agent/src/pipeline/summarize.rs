//! Summarize: one vision call over the notes, written as markdown

use quill_core::domain::job::{Job, Payload};
use quill_core::layout::DocumentPath;
use serde_json::Value;
use tracing::info;

use crate::engine::{PipelineEngine, PipelineError};
use crate::prompts;

pub async fn run(engine: &PipelineEngine, job: &Job) -> Result<Payload, PipelineError> {
    let layout = engine.layout();
    let document = DocumentPath::parse(layout, &job.document_path)?;

    let pages = engine.load_pages(document.as_str()).await?;
    let prompt = PipelineEngine::vision_prompt(
        &pages,
        prompts::summarize(job.instruction.as_deref()),
    );
    let completion = engine
        .complete(&prompt, engine.config().summary_max_tokens, false)
        .await?;
    let summary = completion.text;

    let output_path = layout.summary_output_path(&document);
    engine
        .storage()
        .write(&output_path, summary.as_bytes(), "text/markdown")
        .await?;

    info!(job_id = %job.id, output = %output_path, pages = pages.len(), "Summary written");

    let mut output = Payload::new();
    output.insert("summary".into(), Value::String(summary));
    output.insert("output_path".into(), Value::String(output_path));
    output.insert("pages_processed".into(), Value::from(pages.len()));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quill_core::domain::job::{Job, JobKind};
    use quill_storage::StorageGateway;

    use crate::engine::PipelineEngine;
    use crate::testing::{CORRUPT_DOCUMENT, FixedPages, ScriptedClient, storage_with_document};

    #[tokio::test]
    async fn test_two_page_summary() {
        let storage = storage_with_document("Notes/x.pdf", b"%PDF-1.7").await;
        let llm = Arc::new(ScriptedClient::new().reply("## Main Points\n- ship it"));
        let engine = PipelineEngine::new(storage.clone(), llm.clone(), Arc::new(FixedPages::new(2)));

        let job = Job::new(JobKind::Summarize, "raw/Notes/x.pdf")
            .with_instruction(Some("focus on dates".into()));
        let result = engine.run(&job).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output["pages_processed"], 2);
        assert_eq!(result.output["output_path"], "notes/Notes/x.md");
        assert_eq!(result.output_location().as_deref(), Some("notes/Notes/x.md"));

        let written = storage.fetch("notes/Notes/x.md").await.unwrap();
        assert_eq!(written, b"## Main Points\n- ship it");

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].images, 2);
        assert_eq!(prompts[0].max_tokens, 4096);
        assert!(prompts[0].text.contains("Additional context: focus on dates"));
    }

    #[tokio::test]
    async fn test_empty_document_fails_without_writes() {
        let storage = storage_with_document("Notes/empty.pdf", b"").await;
        let llm = Arc::new(ScriptedClient::new().reply("unused"));
        let engine = PipelineEngine::new(storage.clone(), llm.clone(), Arc::new(FixedPages::new(2)));

        let job = Job::new(JobKind::Summarize, "raw/Notes/empty.pdf");
        let result = engine.run(&job).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("no pages"));
        assert_eq!(llm.call_count(), 0);
        assert_eq!(storage.paths().await, vec!["raw/Notes/empty.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_document_reports_no_pages() {
        let storage = storage_with_document("Notes/bad.pdf", CORRUPT_DOCUMENT).await;
        let llm = Arc::new(ScriptedClient::new());
        let engine = PipelineEngine::new(storage.clone(), llm, Arc::new(FixedPages::new(2)));

        let job = Job::new(JobKind::Summarize, "raw/Notes/bad.pdf");
        let result = engine.run(&job).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("no pages"), "{error}");
        assert!(error.contains("bad header"), "{error}");
        assert_eq!(storage.paths().await.len(), 1);
    }
}
