//! Pipeline outcome types

use serde::{Deserialize, Serialize};

use crate::domain::job::Payload;

/// Outcome of one pipeline execution
///
/// `output` is meaningful when `success` is true, `error` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    #[serde(default)]
    pub output: Payload,
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn succeeded(output: Payload) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: Payload::new(),
            error: Some(error.into()),
        }
    }

    /// Failure that still carries diagnostic data (e.g. the raw model text)
    pub fn failed_with(error: impl Into<String>, output: Payload) -> Self {
        Self {
            success: false,
            output,
            error: Some(error.into()),
        }
    }

    /// Where the result was written: `output_path`, else `project_path`
    pub fn output_location(&self) -> Option<String> {
        ["output_path", "project_path"]
            .iter()
            .find_map(|key| self.output.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_location_prefers_output_path() {
        let mut output = Payload::new();
        output.insert("project_path".into(), "projects/a".into());
        output.insert("output_path".into(), "notes/Notes/a.md".into());

        let result = PipelineResult::succeeded(output);
        assert_eq!(result.output_location().as_deref(), Some("notes/Notes/a.md"));
    }

    #[test]
    fn test_failed_has_no_location() {
        let result = PipelineResult::failed("boom");
        assert!(!result.success);
        assert_eq!(result.output_location(), None);
    }
}
