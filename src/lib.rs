pub mod application;
pub mod connector;
pub mod domain;
pub mod tui;

pub use application::{
    ChatClient, ChatMessage, ChatSession, ContentBlock, EventStream, InferenceParams,
    OutboundRequest, StreamEvent, DEFAULT_DOCUMENT_PROMPT, DEFAULT_SYSTEM_PROMPT,
};

pub use connector::{AnthropicClient, MockChatClient, RecordedRequest, DEFAULT_BASE_URL};

pub use domain::{
    sanitize_document_name, Conversation, DocumentAttachment, DocumentFormat, DomainError,
    PendingAttachment, Role, Turn, TurnContent, ERROR_PREFIX, GENERIC_FAILURE,
    MAX_DOCUMENT_BYTES,
};
