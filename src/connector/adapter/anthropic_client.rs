use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::StreamExt;
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::{ChatClient, ChatMessage, ContentBlock, EventStream, InferenceParams, StreamEvent};
use crate::domain::DomainError;

/// Default target: the Anthropic cloud endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5";

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    system: &'a str,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ApiBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiBlock {
    Text {
        text: String,
    },
    Document {
        source: ApiDocumentSource,
        title: String,
    },
}

#[derive(Serialize)]
struct ApiDocumentSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

/// Streaming HTTP client for the Anthropic Messages API (and compatible
/// endpoints).
///
/// Implements [`ChatClient`] so the conversation state machine stays
/// decoupled from transport and serialization details. Responses arrive as
/// server-sent events; each `content_block_delta` frame becomes one
/// [`StreamEvent::Delta`], in arrival order.
///
/// Configuration comes from the environment:
///
/// ```text
/// ANTHROPIC_API_KEY=sk-ant-...
/// ANTHROPIC_MODEL=claude-haiku-4-5
/// ANTHROPIC_BASE_URL=https://api.anthropic.com
/// ```
///
/// Before each request the client sends a lightweight `HEAD /` probe with a
/// 2-second timeout. If the server isn't reachable the call fails
/// immediately instead of hanging on the full connect cycle.
pub struct AnthropicClient {
    client: reqwest::Client,
    /// Cheap connectivity check — short timeout, discards the response body.
    probe_client: reqwest::Client,
    api_key: String,
    model: String,
    /// Full endpoint URL (base + MESSAGES_PATH).
    url: String,
    /// Base URL used for the probe.
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base: String = base_url.into();
        let trimmed = base.trim_end_matches('/');
        let url = format!("{trimmed}{MESSAGES_PATH}");
        let base_url = format!("{trimmed}/");
        Self {
            // No overall timeout: a response streams for as long as the model
            // generates. Only the connect phase is bounded.
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            probe_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(2))
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            url,
            base_url,
        }
    }

    /// Construct from environment variables, read once at startup:
    ///
    /// | Variable             | Default                     |
    /// |----------------------|-----------------------------|
    /// | `ANTHROPIC_BASE_URL` | `https://api.anthropic.com` |
    /// | `ANTHROPIC_MODEL`    | `claude-haiku-4-5`          |
    /// | `ANTHROPIC_API_KEY`  | `""` (empty)                |
    pub fn from_env() -> Self {
        let base =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        Self::new(key, model, base)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Return the configured base URL (for logging purposes).
    pub fn configured_base_url() -> String {
        std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn stream_chat(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        params: InferenceParams,
    ) -> Result<EventStream, DomainError> {
        // Fast connectivity probe: any HTTP response — even 4xx/5xx — means
        // the server is up; only connection-refused and probe timeout fail.
        match self.probe_client.head(&self.base_url).send().await {
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Err(DomainError::stream(format!(
                    "server not reachable at {}: {e}",
                    self.base_url.trim_end_matches('/')
                )));
            }
            _ => {}
        }

        let request = ApiRequest {
            model: &self.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: true,
            system,
            messages: messages.into_iter().map(to_api_message).collect(),
        };

        debug!(model = %self.model, "opening message stream");
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::stream(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("API returned {status}: {body}");
            return Err(DomainError::stream(api_error_message(status, &body)));
        }

        let byte_stream = response.bytes_stream();
        let events = try_stream! {
            let mut buf = Vec::<u8>::new();

            futures_util::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk
                    .map_err(|e| DomainError::stream(format!("connection interrupted: {e}")))?;
                buf.extend_from_slice(&chunk);

                while let Some(pos) = find_double_newline(&buf) {
                    let frame = buf.drain(..pos + 2).collect::<Vec<_>>();
                    let text = String::from_utf8_lossy(&frame);

                    for line in text.lines() {
                        let line = line.trim();
                        if !line.starts_with("data:") {
                            continue;
                        }
                        let data = line.trim_start_matches("data:").trim();
                        if let Some(event) = parse_sse_data(data)? {
                            yield event;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(events))
    }
}

fn to_api_message(message: ChatMessage) -> ApiMessage {
    let content = message
        .blocks
        .into_iter()
        .map(|block| match block {
            ContentBlock::Text(text) => ApiBlock::Text { text },
            ContentBlock::Document {
                name,
                format,
                bytes,
            } => ApiBlock::Document {
                source: ApiDocumentSource {
                    kind: "base64",
                    media_type: format.media_type(),
                    data: BASE64.encode(bytes),
                },
                title: name,
            },
        })
        .collect();

    ApiMessage {
        role: message.role.as_str(),
        content,
    }
}

/// Translate one SSE `data:` payload into a stream event.
///
/// Only `content_block_delta` (text) and `message_stop` are surfaced; the
/// bookkeeping frames (`message_start`, `content_block_start`/`stop`,
/// `message_delta`, `ping`) carry nothing the state machine needs. An
/// `error` frame terminates the stream with the service's own message.
fn parse_sse_data(data: &str) -> Result<Option<StreamEvent>, DomainError> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| DomainError::stream(format!("malformed stream payload: {e}")))?;

    match value["type"].as_str() {
        Some("content_block_delta") => Ok(value["delta"]["text"]
            .as_str()
            .filter(|text| !text.is_empty())
            .map(|text| StreamEvent::Delta(text.to_string()))),
        Some("message_stop") => Ok(Some(StreamEvent::Done)),
        Some("error") => {
            let message = value["error"]["message"]
                .as_str()
                .unwrap_or("the service reported an error")
                .to_string();
            Err(DomainError::stream(message))
        }
        _ => Ok(None),
    }
}

/// Derive a user-facing message from a non-2xx response, preferring the
/// service's own error text when the body carries one.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
        .unwrap_or_else(|| format!("the service returned {status}"))
}

/// Find the position of a double newline in the buffer.
fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentFormat, Role};

    #[test]
    fn test_parse_text_delta() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#;
        assert_eq!(
            parse_sse_data(data).unwrap(),
            Some(StreamEvent::Delta("Hel".to_string()))
        );
    }

    #[test]
    fn test_parse_message_stop() {
        let data = r#"{"type":"message_stop"}"#;
        assert_eq!(parse_sse_data(data).unwrap(), Some(StreamEvent::Done));
    }

    #[test]
    fn test_bookkeeping_frames_are_skipped() {
        for data in [
            r#"{"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"{"type":"content_block_start","index":0}"#,
            r#"{"type":"content_block_stop","index":0}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#,
            r#"{"type":"ping"}"#,
        ] {
            assert_eq!(parse_sse_data(data).unwrap(), None, "for {data}");
        }
    }

    #[test]
    fn test_error_frame_carries_service_message() {
        let data = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = parse_sse_data(data).unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(parse_sse_data("not json").is_err());
    }

    #[test]
    fn test_api_error_message_prefers_body_text() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#;
        let message = api_error_message(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(message, "max_tokens too large");

        let fallback = api_error_message(reqwest::StatusCode::BAD_GATEWAY, "<html>");
        assert!(fallback.contains("502"));
    }

    #[test]
    fn test_find_double_newline() {
        assert_eq!(find_double_newline(b"a\n\nb"), Some(1));
        assert_eq!(find_double_newline(b"a\nb"), None);
    }

    #[test]
    fn test_document_block_serialization() {
        let message = ChatMessage {
            role: Role::User,
            blocks: vec![
                ContentBlock::Text("see attached".to_string()),
                ContentBlock::Document {
                    name: "Report-(Final)".to_string(),
                    format: DocumentFormat::Pdf,
                    bytes: b"%PDF-1.4".to_vec(),
                },
            ],
        };

        let value = serde_json::to_value(to_api_message(message)).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "see attached");
        assert_eq!(value["content"][1]["type"], "document");
        assert_eq!(value["content"][1]["title"], "Report-(Final)");
        assert_eq!(value["content"][1]["source"]["type"], "base64");
        assert_eq!(value["content"][1]["source"]["media_type"], "application/pdf");
        assert_eq!(
            value["content"][1]["source"]["data"],
            BASE64.encode(b"%PDF-1.4")
        );
    }
}
