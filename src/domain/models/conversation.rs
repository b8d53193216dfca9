use crate::domain::error::DomainError;
use crate::domain::models::{Turn, TurnContent};

/// Prefix carried by every error turn.
pub const ERROR_PREFIX: &str = "Error: ";

/// Shown when a failure carries no message of its own.
pub const GENERIC_FAILURE: &str = "something went wrong while generating a response";

/// The ordered sequence of turns, plus the index of the assistant turn
/// currently receiving stream deltas.
///
/// Insertion order is display order is chronological order. At most one
/// assistant turn is open at any time; every mutation goes through the
/// methods here rather than ad hoc list edits.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    open_turn: Option<usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// True while an assistant turn is open and new submissions are rejected.
    pub fn is_awaiting(&self) -> bool {
        self.open_turn.is_some()
    }

    /// Starts one submit cycle: appends the immutable user turn and the empty
    /// assistant turn that the stream will fill in place.
    pub fn begin_cycle(&mut self, user_content: TurnContent) -> Result<(), DomainError> {
        if self.open_turn.is_some() {
            return Err(DomainError::invalid_input(
                "a response is already in progress",
            ));
        }
        self.turns.push(Turn::user(user_content));
        self.turns.push(Turn::assistant_empty());
        self.open_turn = Some(self.turns.len() - 1);
        Ok(())
    }

    /// The single mutation point for stream deltas: append-only concatenation
    /// onto the open assistant turn.
    pub fn append_delta(&mut self, delta: &str) -> Result<(), DomainError> {
        let index = self
            .open_turn
            .ok_or_else(|| DomainError::internal("no assistant turn is open"))?;
        self.turns[index].append_text(delta)
    }

    /// Closes the cycle after normal stream completion. The concatenated text
    /// is retained as-is.
    pub fn finish_cycle(&mut self) {
        self.open_turn = None;
    }

    /// Closes the cycle after a failure. The partially filled (possibly
    /// empty) assistant turn stays in place and an additional error turn is
    /// appended after it.
    pub fn fail_cycle(&mut self, message: Option<&str>) {
        self.push_error(message);
        self.open_turn = None;
    }

    /// Appends an error turn outside of any cycle, e.g. when reading the
    /// selected file fails before a request is ever dispatched.
    pub fn push_error(&mut self, message: Option<&str>) {
        let text = match message {
            Some(m) if !m.is_empty() => format!("{ERROR_PREFIX}{m}"),
            _ => format!("{ERROR_PREFIX}{GENERIC_FAILURE}"),
        };
        self.turns.push(Turn::assistant_text(text));
    }

    /// Text of the currently open assistant turn, when one exists.
    pub fn open_turn_text(&self) -> Option<&str> {
        self.open_turn
            .and_then(|index| self.turns[index].content().text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Role;

    #[test]
    fn test_begin_cycle_appends_two_turns() {
        let mut conversation = Conversation::new();
        conversation
            .begin_cycle(TurnContent::Text("hi".into()))
            .unwrap();

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.turns()[0].role(), Role::User);
        assert_eq!(conversation.turns()[1].role(), Role::Assistant);
        assert_eq!(conversation.turns()[1].content().text(), Some(""));
        assert!(conversation.is_awaiting());
    }

    #[test]
    fn test_second_cycle_rejected_while_open() {
        let mut conversation = Conversation::new();
        conversation
            .begin_cycle(TurnContent::Text("first".into()))
            .unwrap();

        let err = conversation
            .begin_cycle(TurnContent::Text("second".into()))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_deltas_concatenate_in_order() {
        let mut conversation = Conversation::new();
        conversation
            .begin_cycle(TurnContent::Text("hi".into()))
            .unwrap();

        for delta in ["Hel", "lo", " world"] {
            conversation.append_delta(delta).unwrap();
        }
        assert_eq!(conversation.open_turn_text(), Some("Hello world"));

        conversation.finish_cycle();
        assert!(!conversation.is_awaiting());
        assert_eq!(conversation.turns()[1].content().text(), Some("Hello world"));
    }

    #[test]
    fn test_append_delta_without_open_turn_fails() {
        let mut conversation = Conversation::new();
        assert!(conversation.append_delta("x").is_err());
    }

    #[test]
    fn test_fail_cycle_keeps_empty_turn_and_appends_error() {
        let mut conversation = Conversation::new();
        conversation
            .begin_cycle(TurnContent::Text("hi".into()))
            .unwrap();

        conversation.fail_cycle(Some("quota exceeded"));

        // The empty assistant turn survives; the error turn follows it.
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.turns()[1].content().text(), Some(""));
        assert_eq!(
            conversation.turns()[2].content().text(),
            Some("Error: quota exceeded")
        );
        assert!(!conversation.is_awaiting());
    }

    #[test]
    fn test_fail_cycle_generic_fallback() {
        let mut conversation = Conversation::new();
        conversation
            .begin_cycle(TurnContent::Text("hi".into()))
            .unwrap();

        conversation.fail_cycle(None);
        let text = conversation.turns()[2].content().text().unwrap();
        assert_eq!(text, format!("{ERROR_PREFIX}{GENERIC_FAILURE}"));

        conversation
            .begin_cycle(TurnContent::Text("again".into()))
            .unwrap();
        conversation.fail_cycle(Some(""));
        let text = conversation.turns()[5].content().text().unwrap();
        assert_eq!(text, format!("{ERROR_PREFIX}{GENERIC_FAILURE}"));
    }
}
