//! Structured output helpers
//!
//! Models wrap JSON in markdown fences often enough that every structured
//! phase goes through [`parse_structured`]. Lookup order for the JSON text:
//! a ```` ```json ```` fence, then any fence, then the raw response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

const FENCE: &str = "```";

/// Response that did not parse into the expected JSON shape
#[derive(Debug, Clone, Error)]
#[error("response is not valid JSON: {reason}")]
pub struct StructuredOutputError {
    pub reason: String,
    /// Full response text
    pub raw: String,
}

impl StructuredOutputError {
    /// Head of the raw text, for logs and failure payloads
    pub fn preview(&self, max_chars: usize) -> String {
        match self.raw.char_indices().nth(max_chars) {
            Some((idx, _)) => format!("{}...", &self.raw[..idx]),
            None => self.raw.clone(),
        }
    }
}

/// Returns the JSON candidate inside `text`
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        return until_fence(body).trim();
    }

    if let Some(start) = text.find(FENCE) {
        let body = &text[start + FENCE.len()..];
        // Drop an info string such as `javascript` on the opening line
        let body = match body.split_once('\n') {
            Some((tag, rest)) if is_info_string(tag) => rest,
            _ => body,
        };
        return until_fence(body).trim();
    }

    text.trim()
}

fn until_fence(body: &str) -> &str {
    match body.find(FENCE) {
        Some(end) => &body[..end],
        None => body,
    }
}

fn is_info_string(tag: &str) -> bool {
    let tag = tag.trim();
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

/// Extracts and deserializes the JSON object in a model response
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, StructuredOutputError> {
    serde_json::from_str(extract_json_block(text)).map_err(|e| StructuredOutputError {
        reason: e.to_string(),
        raw: text.to_string(),
    })
}

/// Field deserializer reading an explicit `null` as the type's default
///
/// Use together with `#[serde(default)]` so a missing field behaves the same.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Removes the outermost wrapping fence pair from generated file content
///
/// The opening line is dropped when the content starts with a fence; the
/// last line is dropped only if it is a bare fence. Fences nested inside
/// are content and survive. Content without a leading fence is returned
/// unchanged.
pub fn strip_code_fence(content: &str) -> String {
    if !content.starts_with(FENCE) {
        return content.to_string();
    }

    let lines: Vec<&str> = content.trim_end().split('\n').collect();
    let body = match lines.split_last() {
        Some((last, rest)) if lines.len() >= 2 && last.trim() == FENCE => &rest[1..],
        _ => &lines[1..],
    };
    body.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[test]
    fn test_prefers_json_fence() {
        let text = "Here:\n```python\nprint()\n```\n```json\n{\"name\": \"a\"}\n```";
        assert_eq!(extract_json_block(text), "{\"name\": \"a\"}");
    }

    #[test]
    fn test_falls_back_to_any_fence() {
        let text = "Sure!\n```\n{\"name\": \"b\"}\n```\nDone.";
        assert_eq!(extract_json_block(text), "{\"name\": \"b\"}");

        let tagged = "```javascript\n{\"name\": \"c\"}\n```";
        assert_eq!(extract_json_block(tagged), "{\"name\": \"c\"}");
    }

    #[test]
    fn test_falls_back_to_raw_text() {
        assert_eq!(extract_json_block("  {\"name\": \"d\"}\n"), "{\"name\": \"d\"}");
    }

    #[test]
    fn test_unterminated_fence() {
        let text = "```json\n{\"name\": \"e\"}";
        let parsed: Named = parse_structured(text).unwrap();
        assert_eq!(parsed.name, "e");
    }

    #[test]
    fn test_parse_failure_keeps_raw_text() {
        let err = parse_structured::<Named>("I could not do that.").unwrap_err();
        assert_eq!(err.raw, "I could not do that.");
        assert_eq!(err.preview(5), "I cou...");
    }

    #[test]
    fn test_strip_fence_pair() {
        let wrapped = "```python\nimport os\nprint(os.name)\n```";
        assert_eq!(strip_code_fence(wrapped), "import os\nprint(os.name)");
    }

    #[test]
    fn test_strip_fence_without_closing_line() {
        let wrapped = "```rust\nfn main() {}";
        assert_eq!(strip_code_fence(wrapped), "fn main() {}");
    }

    #[test]
    fn test_strip_fence_trailing_newline() {
        let wrapped = "```\nline\n```\n";
        assert_eq!(strip_code_fence(wrapped), "line");
    }

    #[test]
    fn test_strip_leaves_unfenced_content() {
        let once = strip_code_fence("```js\nconsole.log(1)\n```");
        assert_eq!(once, "console.log(1)");
        assert_eq!(strip_code_fence(&once), once);

        let plain = "no fences here\n";
        assert_eq!(strip_code_fence(plain), plain);
    }

    #[test]
    fn test_strip_only_outer_fence_pair() {
        let readme = "```markdown\n```sh\ncargo run\n```\n```";
        assert_eq!(strip_code_fence(readme), "```sh\ncargo run\n```");
    }

    #[test]
    fn test_null_fields_read_as_default() {
        #[derive(Debug, Deserialize)]
        struct Entry {
            #[serde(default, deserialize_with = "null_as_default")]
            content: String,
            #[serde(default, deserialize_with = "null_as_default")]
            tags: Vec<String>,
        }

        let entry: Entry = parse_structured(r#"{"content": null, "tags": null}"#).unwrap();
        assert_eq!(entry.content, "");
        assert!(entry.tags.is_empty());

        let entry: Entry = parse_structured(r#"{"content": "x"}"#).unwrap();
        assert_eq!(entry.content, "x");
        assert!(parse_structured::<Entry>(r#"{"content": 3}"#).is_err());
    }

    #[test]
    fn test_strip_lone_fence() {
        assert_eq!(strip_code_fence("```"), "");
    }
}
