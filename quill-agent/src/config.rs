//! Engine limits

use crate::rasterize::DEFAULT_DPI;

/// Per-phase token ceilings and context limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub dpi: u32,
    pub summary_max_tokens: u32,
    pub requirements_max_tokens: u32,
    pub structure_max_tokens: u32,
    pub file_max_tokens: u32,
    pub plan_max_tokens: u32,
    pub changes_max_tokens: u32,
    /// Infer-action generates a whole project in one streamed call
    pub infer_max_tokens: u32,
    /// Existing-project files read into the planning context
    pub context_max_files: usize,
    /// Files above this size are left out of the context
    pub context_max_file_bytes: u64,
    /// Characters of each file shown to the planner
    pub context_preview_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            summary_max_tokens: 4096,
            requirements_max_tokens: 4096,
            structure_max_tokens: 2048,
            file_max_tokens: 4096,
            plan_max_tokens: 4096,
            changes_max_tokens: 8192,
            infer_max_tokens: 64000,
            context_max_files: 20,
            context_max_file_bytes: 50_000,
            context_preview_chars: 2000,
        }
    }
}
