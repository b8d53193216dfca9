use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::domain::{DocumentFormat, DomainError, Role};

/// One message in the collaborator's wire shape: a role plus ordered content
/// blocks.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
}

/// Tagged union of the block kinds the collaborator accepts.
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text(String),
    Document {
        name: String,
        format: DocumentFormat,
        bytes: Vec<u8>,
    },
}

/// Fixed inference parameters sent with every request.
#[derive(Debug, Clone, Copy)]
pub struct InferenceParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.5,
        }
    }
}

/// One streamed inference event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An incremental fragment of assistant text, in arrival order.
    Delta(String),
    /// Normal end of the response.
    Done,
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, DomainError>> + Send>>;

/// An interface for one streaming exchange with a hosted inference service.
///
/// Implementors encapsulate transport, authentication, serialization, and
/// vendor-specific API details. Consumers (e.g. [`crate::application::ChatSession`])
/// stay decoupled from any particular provider, so swapping providers touches
/// only the adapter.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens a streaming request carrying the `system` instruction, the full
    /// ordered message history, and the fixed inference parameters. Yields
    /// text deltas in exactly the order the service produces them.
    async fn stream_chat(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        params: InferenceParams,
    ) -> Result<EventStream, DomainError>;
}
