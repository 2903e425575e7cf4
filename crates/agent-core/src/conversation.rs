//! Conversation Turns
//!
//! The append-only turn sequence threaded between model calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::CapabilityResult;

/// Role of a turn's author
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input (and, by protocol convention, capability results)
    User,
    /// Assistant (LLM) response
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content carried by a turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    /// Plain text
    Text { text: String },
    /// Raw payload returned by a capability invocation
    CapabilityResult { result: CapabilityResult },
}

/// A single role-tagged unit of a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,

    pub content: TurnContent,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, content: TurnContent) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a user text turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, TurnContent::Text { text: text.into() })
    }

    /// Create an assistant text turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, TurnContent::Text { text: text.into() })
    }

    /// Wrap a capability result; these are always `user` turns.
    pub fn capability_result(result: CapabilityResult) -> Self {
        Self::new(Role::User, TurnContent::CapabilityResult { result })
    }

    /// Text of a plain text turn
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text { text } => Some(text),
            TurnContent::CapabilityResult { .. } => None,
        }
    }

    /// Render the content as text, whatever its kind
    pub fn render_text(&self) -> String {
        match &self.content {
            TurnContent::Text { text } => text.clone(),
            TurnContent::CapabilityResult { result } => result.to_text(),
        }
    }
}

/// Ordered, append-only sequence of turns
///
/// Existing turns can be read but never removed, reordered or edited.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation seeded with one user query
    pub fn with_query(query: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.push(Turn::user(query));
        conv
    }

    /// Append a turn
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of capability results inserted so far
    pub fn capability_results(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| matches!(t.content, TurnContent::CapabilityResult { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = Turn::user("Hello");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.text(), Some("Hello"));
    }

    #[test]
    fn test_capability_result_is_user_turn() {
        let turn = Turn::capability_result(CapabilityResult::text("sunny"));
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.text(), None);
        assert_eq!(turn.render_text(), "sunny");
    }

    #[test]
    fn test_conversation_appends_in_order() {
        let mut conv = Conversation::with_query("what's the weather");
        conv.push(Turn::capability_result(CapabilityResult::text("sunny")));
        conv.push(Turn::assistant("It's sunny."));

        assert_eq!(conv.len(), 3);
        assert_eq!(conv.capability_results(), 1);
        assert_eq!(conv.turns()[0].text(), Some("what's the weather"));
        assert_eq!(conv.last().map(|t| t.role), Some(Role::Assistant));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
