//! Prompt templates for every pipeline phase

fn additional_context(instruction: Option<&str>) -> String {
    match instruction.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => format!("\n\nAdditional context: {}", text),
        None => String::new(),
    }
}

pub fn summarize(instruction: Option<&str>) -> String {
    format!(
        "Analyze these handwritten notes and provide a structured summary.{}

Provide:
1. **Main Points** - Key ideas and concepts
2. **Details** - Important specifics, data, or examples
3. **Action Items** - Tasks or next steps (if any)
4. **Questions/Open Items** - Unresolved items or things to follow up on (if any)

Be thorough but concise. Capture everything important.",
        additional_context(instruction)
    )
}

pub fn requirements(instruction: Option<&str>) -> String {
    format!(
        "Analyze these handwritten notes describing a software project.{}

Extract and structure:
1. **Project Overview** - What is being built (1-2 sentences)
2. **Core Features** - Main functionality (bulleted list)
3. **Technical Requirements** - Languages, frameworks, dependencies
4. **Data Models** - Key entities and their relationships
5. **API/Endpoints** - If applicable
6. **Constraints** - Performance, security, or other requirements

Be specific and thorough. This will be used to generate code.",
        additional_context(instruction)
    )
}

pub fn structure(requirements: &str) -> String {
    format!(
        r#"Based on these requirements, generate a project structure.

Requirements:
{requirements}

Return ONLY valid JSON:
{{
    "name": "project-name-kebab-case",
    "type": "web-app|api|cli|library",
    "language": "python|typescript|etc",
    "framework": "fastapi|express|none|etc",
    "directories": ["src", "tests", "etc"],
    "files": ["src/main.py", "README.md", "etc"]
}}"#
    )
}

/// Project metadata shown to the per-file generation prompt
pub struct FileContext<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    pub language: &'a str,
    pub framework: &'a str,
    pub files: &'a [String],
}

pub fn file_content(project: &FileContext<'_>, requirements: &str, path: &str) -> String {
    format!(
        "Generate code for this file.

Project: {}
Type: {}
Language: {}
Framework: {}

Requirements:
{}

All project files: {}

Generate ONLY the code for: {}
No markdown, no explanations, just the raw file content.",
        project.name,
        project.kind,
        project.language,
        project.framework,
        requirements,
        project.files.join(", "),
        path
    )
}

pub fn change_plan(instruction: Option<&str>, context_summary: &str) -> String {
    format!(
        "Analyze these handwritten notes describing changes to an existing project.{}

{}

Create a change plan:
1. **Summary** - What changes are requested
2. **Files to Modify** - List each with specific changes needed
3. **Files to Create** - New files needed
4. **Files to Delete** - If any
5. **Dependencies** - New packages or config changes
6. **Risks** - Breaking changes or things to watch out for",
        additional_context(instruction),
        context_summary
    )
}

pub fn changes(plan: &str, existing_files: &[String]) -> String {
    format!(
        r#"Generate code changes based on this plan.

Change Plan:
{}

Existing Files:
{}

Return ONLY valid JSON:
{{
    "files": [
        {{
            "path": "relative/path/to/file",
            "action": "create|modify|delete",
            "content": "full file content or null for delete"
        }}
    ]
}}

For modifications, include the COMPLETE new file content, not just the changes."#,
        plan,
        existing_files.join("\n")
    )
}

pub fn infer_action(project_name: &str, instruction: Option<&str>) -> String {
    format!(
        r#"Analyze these handwritten notes for a software project called "{}".{}

Extract the requirements and generate a complete project structure.

Respond with JSON:
```json
{{
  "description": "Brief description of what this project does",
  "tech_stack": ["language", "framework", ...],
  "features": ["feature1", "feature2", ...],
  "files": [
    {{"path": "relative/path.ext", "content": "full file content"}}
  ]
}}
```

Generate complete, working code for all files. No placeholders or TODOs."#,
        project_name,
        additional_context(instruction)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_is_appended() {
        let prompt = summarize(Some("focus on deadlines"));
        assert!(prompt.starts_with(
            "Analyze these handwritten notes and provide a structured summary.\n\nAdditional context: focus on deadlines"
        ));
        assert!(!summarize(Some("  ")).contains("Additional context"));
        assert!(!summarize(None).contains("Additional context"));
    }

    #[test]
    fn test_structure_prompt_embeds_requirements() {
        let prompt = structure("A todo CLI");
        assert!(prompt.contains("Requirements:\nA todo CLI"));
        assert!(prompt.contains("\"files\": [\"src/main.py\""));
    }
}
