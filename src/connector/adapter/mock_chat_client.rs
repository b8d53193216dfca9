use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use tracing::debug;

use crate::application::{ChatClient, ChatMessage, EventStream, InferenceParams, StreamEvent};
use crate::domain::DomainError;

/// What a [`MockChatClient`] does when a stream is opened.
#[derive(Debug, Clone)]
enum Script {
    /// Yield these deltas, then finish normally.
    Deltas(Vec<String>),
    /// Yield these deltas, then fail with the message.
    FailAfter(Vec<String>, String),
    /// Refuse to open the stream at all.
    Refuse(String),
}

/// A request as the mock observed it, for assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub params: InferenceParams,
}

/// Scripted [`ChatClient`] used by tests and by `--mock` runs, replaying the
/// same delta sequence for every submission and recording each request it
/// receives.
pub struct MockChatClient {
    script: Script,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::with_deltas(["Hello! ", "This ", "is ", "a ", "scripted ", "response."])
    }

    pub fn with_deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Script::Deltas(deltas.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails the stream with `message` after yielding `deltas` (possibly none).
    pub fn failing_after<I, S>(deltas: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Script::FailAfter(
                deltas.into_iter().map(Into::into).collect(),
                message.into(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every request before any stream opens.
    pub fn refusing(message: impl Into<String>) -> Self {
        Self {
            script: Script::Refuse(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request this client has observed, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn stream_chat(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        params: InferenceParams,
    ) -> Result<EventStream, DomainError> {
        debug!(message_count = messages.len(), "mock stream requested");
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                system: system.to_string(),
                messages,
                params,
            });
        }

        let events: Vec<Result<StreamEvent, DomainError>> = match &self.script {
            Script::Deltas(deltas) => deltas
                .iter()
                .map(|d| Ok(StreamEvent::Delta(d.clone())))
                .chain(std::iter::once(Ok(StreamEvent::Done)))
                .collect(),
            Script::FailAfter(deltas, message) => deltas
                .iter()
                .map(|d| Ok(StreamEvent::Delta(d.clone())))
                .chain(std::iter::once(Err(DomainError::stream(message.clone()))))
                .collect(),
            Script::Refuse(message) => return Err(DomainError::stream(message.clone())),
        };

        Ok(Box::pin(stream::iter(events)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_mock_replays_deltas_then_done() {
        let client = MockChatClient::with_deltas(["Hel", "lo"]);
        let mut stream = client
            .stream_chat("system", Vec::new(), InferenceParams::default())
            .await
            .unwrap();

        let mut collected = Vec::new();
        while let Some(event) = stream.next().await {
            collected.push(event.unwrap());
        }
        assert_eq!(
            collected,
            vec![
                StreamEvent::Delta("Hel".to_string()),
                StreamEvent::Delta("lo".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let client = MockChatClient::new();
        let _ = client
            .stream_chat("sys", Vec::new(), InferenceParams::default())
            .await
            .unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system, "sys");
    }

    #[tokio::test]
    async fn test_refusing_mock_fails_before_streaming() {
        let client = MockChatClient::refusing("no capacity");
        let err = match client
            .stream_chat("sys", Vec::new(), InferenceParams::default())
            .await
        {
            Ok(_) => panic!("expected refusing mock to fail before streaming"),
            Err(e) => e,
        };
        assert!(err.is_stream_error());
    }
}
