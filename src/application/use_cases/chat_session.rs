use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::application::interfaces::{
    ChatClient, ChatMessage, ContentBlock, InferenceParams, StreamEvent,
};
use crate::domain::{
    sanitize_document_name, Conversation, DocumentAttachment, DomainError, PendingAttachment,
    TurnContent,
};

/// Instruction substituted when a document is submitted without any text.
pub const DEFAULT_DOCUMENT_PROMPT: &str = "Please summarize the attached document.";

/// System instruction sent with every request unless overridden at startup.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a concise assistant. When a document is attached, ground your answers in it.";

/// A fully prepared request, ready to hand to the [`ChatClient`].
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub params: InferenceParams,
}

/// The conversation state machine.
///
/// Owns the [`Conversation`], the transient pending attachment, and the
/// client seam. `Idle` and `AwaitingResponse` are not a separate enum: the
/// machine is awaiting exactly while the conversation has an open assistant
/// turn, so the two can never disagree.
///
/// All mutation funnels through two entry points: [`Self::begin_submit`] for
/// user submissions and [`Self::apply_event`] for stream events. The caller
/// drives both from a single scheduling context, one event at a time.
pub struct ChatSession {
    conversation: Conversation,
    pending: Option<PendingAttachment>,
    client: Arc<dyn ChatClient>,
    system_prompt: String,
    params: InferenceParams,
}

impl ChatSession {
    pub fn new(client: Arc<dyn ChatClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(),
            pending: None,
            client,
            system_prompt: system_prompt.into(),
            params: InferenceParams::default(),
        }
    }

    pub fn with_params(mut self, params: InferenceParams) -> Self {
        self.params = params;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_awaiting(&self) -> bool {
        self.conversation.is_awaiting()
    }

    pub fn client(&self) -> Arc<dyn ChatClient> {
        self.client.clone()
    }

    pub fn pending_attachment(&self) -> Option<&PendingAttachment> {
        self.pending.as_ref()
    }

    /// Selects a document for the next submission, replacing any previous
    /// selection. Wrong format, oversize, or unreadable paths are rejected
    /// here, before the conversation can be touched.
    pub fn attach(&mut self, path: &Path) -> Result<(), DomainError> {
        if self.is_awaiting() {
            return Err(DomainError::invalid_input(
                "cannot attach while a response is in progress",
            ));
        }
        let pending = PendingAttachment::select(path)?;
        info!(
            name = %pending.display_name(),
            size_bytes = pending.size_bytes(),
            "attachment selected"
        );
        self.pending = Some(pending);
        Ok(())
    }

    pub fn clear_attachment(&mut self) {
        self.pending = None;
    }

    /// Accepts or rejects one submission.
    ///
    /// Returns `Ok(Some(request))` when a cycle was started: the user turn
    /// and the empty assistant turn are appended, the pending attachment and
    /// caller's input should be considered consumed, and the returned request
    /// must be dispatched to the client. Returns `Ok(None)` for a no-op
    /// (nothing to send) or when attachment processing failed — in that case
    /// the failure is already recorded as an error turn.
    ///
    /// A submission while a response is in progress is an error; the caller
    /// surfaces it without any state change.
    pub async fn begin_submit(&mut self, raw_text: &str) -> Result<Option<OutboundRequest>, DomainError> {
        if self.is_awaiting() {
            return Err(DomainError::invalid_input(
                "a response is already in progress",
            ));
        }

        let text = raw_text.trim();
        if text.is_empty() && self.pending.is_none() {
            return Ok(None);
        }

        let document = match self.pending.take() {
            None => None,
            Some(pending) => match load_document(&pending).await {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(name = %pending.display_name(), error = %e, "attachment processing failed");
                    self.conversation.push_error(Some(&failure_detail(&e)));
                    return Ok(None);
                }
            },
        };

        let content = match (text.is_empty(), document) {
            (false, None) => TurnContent::Text(text.to_string()),
            (false, Some(document)) => TurnContent::TextWithDocument {
                text: text.to_string(),
                document,
            },
            (true, Some(document)) => TurnContent::Document(document),
            (true, None) => return Ok(None),
        };

        self.conversation.begin_cycle(content)?;

        // Everything before the just-opened assistant turn goes on the wire.
        let history = &self.conversation.turns()[..self.conversation.len() - 1];
        let messages = match serialize_history(history) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "history serialization failed");
                self.conversation.fail_cycle(Some(&failure_detail(&e)));
                return Ok(None);
            }
        };

        info!(message_count = messages.len(), "submission accepted");
        Ok(Some(OutboundRequest {
            system: self.system_prompt.clone(),
            messages,
            params: self.params,
        }))
    }

    /// Applies one stream event. Deltas concatenate onto the open assistant
    /// turn; `Done` closes the cycle; an error closes the cycle and appends
    /// an error turn after the partial one. Events arriving after the cycle
    /// closed are dropped.
    pub fn apply_event(&mut self, event: Result<StreamEvent, DomainError>) {
        if !self.is_awaiting() {
            debug!("stream event after cycle close, dropping");
            return;
        }
        match event {
            Ok(StreamEvent::Delta(delta)) => {
                if let Err(e) = self.conversation.append_delta(&delta) {
                    warn!(error = %e, "dropping undeliverable delta");
                }
            }
            Ok(StreamEvent::Done) => self.conversation.finish_cycle(),
            Err(e) => {
                warn!(error = %e, "stream failed");
                self.conversation.fail_cycle(Some(&failure_detail(&e)));
            }
        }
    }

    /// Drives one full submit cycle to completion, applying each event
    /// before the next is awaited. Used by headless callers and tests; the
    /// terminal surface dispatches the request itself so it can re-render
    /// between deltas.
    pub async fn run_submit(&mut self, raw_text: &str) -> Result<bool, DomainError> {
        let Some(request) = self.begin_submit(raw_text).await? else {
            return Ok(false);
        };

        let client = self.client.clone();
        let mut stream = match client
            .stream_chat(&request.system, request.messages, request.params)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                self.apply_event(Err(e));
                return Ok(true);
            }
        };

        while let Some(event) = stream.next().await {
            self.apply_event(event);
            if !self.is_awaiting() {
                break;
            }
        }
        // A stream that ends without an explicit Done still completed.
        if self.is_awaiting() {
            self.apply_event(Ok(StreamEvent::Done));
        }
        Ok(true)
    }
}

async fn load_document(pending: &PendingAttachment) -> Result<DocumentAttachment, DomainError> {
    let bytes = tokio::fs::read(pending.path()).await.map_err(|e| {
        DomainError::file_read(format!(
            "could not read '{}': {e}",
            pending.display_name()
        ))
    })?;
    DocumentAttachment::from_bytes(pending.display_name(), &bytes)
}

/// Translates stored turns into the collaborator's message shape.
///
/// Plain text becomes one text block; text plus document becomes a text block
/// followed by a document block; a document alone gets the fixed default
/// instruction as its text block. Document names are re-sanitized (a no-op on
/// already-sanitized names) and bytes are decoded back to their raw form, so
/// the translation is lossless. Turns whose text is still empty (failed
/// cycles never filled them) are skipped; the service rejects empty blocks.
fn serialize_history(turns: &[crate::domain::Turn]) -> Result<Vec<ChatMessage>, DomainError> {
    let mut messages = Vec::with_capacity(turns.len());
    for turn in turns {
        if turn.content().is_empty_text() {
            continue;
        }
        let blocks = match turn.content() {
            TurnContent::Text(text) => vec![ContentBlock::Text(text.clone())],
            TurnContent::TextWithDocument { text, document } => {
                vec![ContentBlock::Text(text.clone()), document_block(document)?]
            }
            TurnContent::Document(document) => vec![
                ContentBlock::Text(DEFAULT_DOCUMENT_PROMPT.to_string()),
                document_block(document)?,
            ],
        };
        messages.push(ChatMessage {
            role: turn.role(),
            blocks,
        });
    }
    Ok(messages)
}

fn document_block(document: &DocumentAttachment) -> Result<ContentBlock, DomainError> {
    Ok(ContentBlock::Document {
        name: sanitize_document_name(document.name()),
        format: document.format(),
        bytes: document.decoded_bytes()?,
    })
}

/// The human-facing part of a failure, without the error-kind prefix.
fn failure_detail(error: &DomainError) -> String {
    match error {
        DomainError::InvalidAttachment(m)
        | DomainError::FileReadError(m)
        | DomainError::StreamError(m)
        | DomainError::ConfigError(m)
        | DomainError::InvalidInput(m)
        | DomainError::Internal(m) => m.clone(),
        DomainError::IoError(e) => e.to_string(),
    }
}
