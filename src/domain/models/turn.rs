use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::models::DocumentAttachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// The three content shapes a turn can carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnContent {
    Text(String),
    TextWithDocument {
        text: String,
        document: DocumentAttachment,
    },
    Document(DocumentAttachment),
}

impl TurnContent {
    pub fn text(&self) -> Option<&str> {
        match self {
            TurnContent::Text(text) => Some(text),
            TurnContent::TextWithDocument { text, .. } => Some(text),
            TurnContent::Document(_) => None,
        }
    }

    pub fn document(&self) -> Option<&DocumentAttachment> {
        match self {
            TurnContent::Text(_) => None,
            TurnContent::TextWithDocument { document, .. } => Some(document),
            TurnContent::Document(document) => Some(document),
        }
    }

    /// True for a plain-text shape holding the empty string.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, TurnContent::Text(text) if text.is_empty())
    }
}

/// One chat message.
///
/// A user turn is immutable once created. An assistant turn starts empty and
/// grows by appended deltas until its stream cycle closes; the id stays
/// stable for the lifetime of the turn so renderers can update in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    id: String,
    role: Role,
    content: TurnContent,
}

impl Turn {
    pub fn user(content: TurnContent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content,
        }
    }

    pub fn assistant_empty() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: TurnContent::Text(String::new()),
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &TurnContent {
        &self.content
    }

    /// Appends a stream delta to this turn's text.
    ///
    /// Only the plain-text shape grows; assistant turns are always created
    /// that way, so any other shape here means the caller lost track of the
    /// open turn.
    pub fn append_text(&mut self, delta: &str) -> Result<(), DomainError> {
        match &mut self.content {
            TurnContent::Text(text) => {
                text.push_str(delta);
                Ok(())
            }
            _ => Err(DomainError::internal(
                "stream delta applied to a document-bearing turn",
            )),
        }
    }

    /// Text used by the terminal renderer.
    pub fn display_text(&self) -> String {
        match &self.content {
            TurnContent::Text(text) => text.clone(),
            TurnContent::TextWithDocument { text, document } => {
                format!("{text}\n[attached: {}]", document.display_name())
            }
            TurnContent::Document(document) => {
                format!("[attached: {}]", document.display_name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_turn_has_stable_id() {
        let turn = Turn::user(TurnContent::Text("hello".into()));
        assert_eq!(turn.role(), Role::User);
        assert!(!turn.id().is_empty());
    }

    #[test]
    fn test_assistant_turn_grows_by_appends() {
        let mut turn = Turn::assistant_empty();
        turn.append_text("Hel").unwrap();
        turn.append_text("lo").unwrap();
        assert_eq!(turn.content().text(), Some("Hello"));
    }

    #[test]
    fn test_append_rejected_on_document_turn() {
        let doc = DocumentAttachment::from_bytes("a.pdf", b"%PDF").unwrap();
        let mut turn = Turn::user(TurnContent::Document(doc));
        assert!(turn.append_text("x").is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Turn::assistant_empty();
        let b = Turn::assistant_empty();
        assert_ne!(a.id(), b.id());
    }
}
