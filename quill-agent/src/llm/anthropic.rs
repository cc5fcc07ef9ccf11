//! Anthropic Messages API client (direct HTTP, `x-api-key`)
//!
//! Streaming reads the server-sent event stream line by line, accumulating
//! `text_delta`s and taking the stop reason from `message_delta`.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Completion, ContentPart, LlmError, PromptingClient, StopReason};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Non-streaming calls may legitimately take minutes
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ApiContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContent {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

// =============================================================================
// SSE Event Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseEvent {
    ContentBlockDelta {
        delta: SseDelta,
    },
    MessageDelta {
        delta: SseMessageDelta,
    },
    Error {
        error: SseError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SseMessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Parses one `data: {...}` line
fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let json_str = line.strip_prefix("data:")?.trim();
    if json_str.is_empty() || json_str == "[DONE]" {
        return None;
    }
    serde_json::from_str(json_str).ok()
}

/// Raw stream bytes split into lines
///
/// A network chunk can end inside a multi-byte character, so bytes are only
/// decoded once a whole line has arrived.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Result<Option<String>, LlmError> {
        let Some(pos) = self.pending.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let line: Vec<u8> = self.pending.drain(..=pos).collect();
        decode_line(line).map(Some)
    }

    /// Whatever trails the last newline
    fn finish(self) -> Result<Option<String>, LlmError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        decode_line(self.pending).map(Some)
    }
}

fn decode_line(line: Vec<u8>) -> Result<String, LlmError> {
    String::from_utf8(line)
        .map_err(|e| LlmError::InvalidResponse(format!("stream is not valid UTF-8: {}", e)))
}

/// Running state of a streamed completion
#[derive(Default)]
struct StreamAccumulator {
    text: String,
    stop_reason: Option<String>,
}

impl StreamAccumulator {
    fn apply(&mut self, event: SseEvent) -> Result<(), LlmError> {
        match event {
            SseEvent::ContentBlockDelta {
                delta: SseDelta::TextDelta { text },
            } => self.text.push_str(&text),
            SseEvent::MessageDelta { delta } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
            }
            SseEvent::Error { error } => {
                return Err(LlmError::Api {
                    kind: error.error_type,
                    message: error.message,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Completion {
        Completion {
            text: self.text,
            stop_reason: self
                .stop_reason
                .as_deref()
                .map(StopReason::from_api)
                .unwrap_or(StopReason::Other),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::AuthFailed);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LlmError::RequestFailed {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Points the client at a different API host (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, content: &[ContentPart], max_tokens: u32, stream: bool) -> MessagesRequest<'a> {
        let content = content
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => ApiContent::Text { text: text.clone() },
                ContentPart::Image { media_type, data } => ApiContent::Image {
                    source: ImageSource {
                        source_type: "base64",
                        media_type: media_type.clone(),
                        data: BASE64.encode(data),
                    },
                },
            })
            .collect();

        MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: vec![ApiMessage {
                role: "user",
                content,
            }],
            stream,
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("content-type", "application/json")
            .json(body);
        if !body.stream {
            request = request.timeout(REQUEST_TIMEOUT);
        }

        let response = request.send().await.map_err(|e| LlmError::RequestFailed {
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let response_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(LlmError::AuthFailed),
            429 => Err(LlmError::RateLimited { retry_after }),
            _ => Err(LlmError::RequestFailed {
                reason: format!("HTTP {}: {}", status, truncate(&response_text, 512)),
            }),
        }
    }

    async fn complete_blocking(&self, body: &MessagesRequest<'_>) -> Result<Completion, LlmError> {
        let response = self.send(body).await?;
        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect();

        Ok(Completion {
            text,
            stop_reason: parsed
                .stop_reason
                .as_deref()
                .map(StopReason::from_api)
                .unwrap_or(StopReason::Other),
        })
    }

    async fn complete_streaming(&self, body: &MessagesRequest<'_>) -> Result<Completion, LlmError> {
        let response = self.send(body).await?;
        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut acc = StreamAccumulator::default();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| LlmError::RequestFailed {
                reason: format!("stream interrupted: {}", e),
            })?;
            lines.extend(&bytes);

            while let Some(line) = lines.next_line()? {
                if let Some(event) = parse_sse_line(line.trim()) {
                    acc.apply(event)?;
                }
            }
        }
        if let Some(line) = lines.finish()? {
            if let Some(event) = parse_sse_line(line.trim()) {
                acc.apply(event)?;
            }
        }

        let completion = acc.finish();
        tracing::debug!(
            chars = completion.text.len(),
            stop_reason = ?completion.stop_reason,
            "Streamed completion finished"
        );
        Ok(completion)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl PromptingClient for AnthropicClient {
    async fn complete(
        &self,
        content: &[ContentPart],
        max_tokens: u32,
        stream: bool,
    ) -> Result<Completion, LlmError> {
        let body = self.build_request(content, max_tokens, stream);

        tracing::debug!(
            model = %self.model,
            parts = content.len(),
            max_tokens,
            stream,
            "Sending prompt"
        );

        if stream {
            self.complete_streaming(&body).await
        } else {
            self.complete_blocking(&body).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicClient {
        AnthropicClient::new("test-key", DEFAULT_MODEL).unwrap()
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        assert!(matches!(
            AnthropicClient::new("  ", DEFAULT_MODEL),
            Err(LlmError::AuthFailed)
        ));
    }

    #[test]
    fn test_request_serialization() {
        let client = client();
        let content = vec![ContentPart::png(vec![1, 2, 3]), ContentPart::text("Summarize")];
        let body = client.build_request(&content, 4096, false);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["max_tokens"], 4096);
        assert!(json.get("stream").is_none());

        let parts = json["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "image");
        assert_eq!(parts[0]["source"]["type"], "base64");
        assert_eq!(parts[0]["source"]["media_type"], "image/png");
        assert_eq!(parts[0]["source"]["data"], "AQID");
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], "Summarize");
    }

    #[test]
    fn test_response_text_blocks() {
        let raw = r#"{
            "content": [{"type": "text", "text": "Hello "}, {"type": "thinking"}, {"type": "text", "text": "world"}],
            "stop_reason": "end_turn"
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content.len(), 3);
        assert_eq!(parsed.stop_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn test_stream_accumulation() {
        let lines = [
            "event: message_start",
            r#"data: {"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"{\"files\":"}}"#,
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" []}"}}"#,
            r#"data: {"type":"ping"}"#,
            r#"data: {"type":"message_delta","delta":{"stop_reason":"max_tokens"},"usage":{"output_tokens":10}}"#,
            r#"data: {"type":"message_stop"}"#,
        ];

        let mut acc = StreamAccumulator::default();
        for line in lines {
            if let Some(event) = parse_sse_line(line) {
                acc.apply(event).unwrap();
            }
        }
        let completion = acc.finish();
        assert_eq!(completion.text, r#"{"files": []}"#);
        assert_eq!(completion.stop_reason, StopReason::MaxTokens);
    }

    #[test]
    fn test_stream_error_event() {
        let line = r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let mut acc = StreamAccumulator::default();
        let err = acc.apply(parse_sse_line(line).unwrap()).unwrap_err();
        assert!(matches!(err, LlmError::Api { ref kind, .. } if kind == "overloaded_error"));
    }

    #[test]
    fn test_line_buffer_waits_for_whole_characters() {
        let line = "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"café\"}}\n";
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1;

        let mut lines = LineBuffer::default();
        lines.extend(&bytes[..split]);
        assert!(lines.next_line().unwrap().is_none());
        lines.extend(&bytes[split..]);

        let decoded = lines.next_line().unwrap().unwrap();
        let mut acc = StreamAccumulator::default();
        acc.apply(parse_sse_line(decoded.trim()).unwrap()).unwrap();
        assert_eq!(acc.finish().text, "café");
        assert!(lines.finish().unwrap().is_none());
    }

    #[test]
    fn test_line_buffer_keeps_unterminated_tail() {
        let mut lines = LineBuffer::default();
        lines.extend(b"event: ping\ndata: {\"type\":\"ping\"}");
        assert_eq!(lines.next_line().unwrap().as_deref(), Some("event: ping\n"));
        assert!(lines.next_line().unwrap().is_none());
        assert_eq!(lines.finish().unwrap().as_deref(), Some(r#"data: {"type":"ping"}"#));
    }

    #[tokio::test]
    async fn test_streamed_character_split_across_writes() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // Read until the JSON body has fully arrived
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.ends_with(b"}") {
                    break;
                }
            }

            let body = concat!(
                "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"café\"}}\n\n",
                "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n",
            )
            .as_bytes();
            let split = body.iter().position(|&b| b == 0xC3).unwrap() + 1;

            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            socket.write_all(&body[..split]).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            socket.write_all(&body[split..]).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let client = client().with_base_url(format!("http://{}", addr));
        let completion = client
            .complete(&[ContentPart::text("hi")], 64, true)
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(completion.text, "café");
        assert_eq!(completion.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
