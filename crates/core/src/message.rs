//! Message domain types.
//!
//! `HistoryMessage` is the value object that crosses component boundaries:
//! the history store hands out snapshots of these, and the assembler packs
//! them. Token costs are an implementation detail of the store and are
//! stripped before a message leaves it.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (identity, rules)
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    /// Lowercase wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Capitalized label used when rendering turns into prompt text.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message, as seen outside the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,
}

impl HistoryMessage {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Render this message as a single `Role: content` prompt line.
    pub fn render_line(&self) -> String {
        format!("{}: {}", self.role.label(), self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = HistoryMessage::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, agent!");
    }

    #[test]
    fn role_names() {
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::Assistant.label(), "Assistant");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn render_line_capitalizes_role() {
        let msg = HistoryMessage::assistant("Hi there!");
        assert_eq!(msg.render_line(), "Assistant: Hi there!");
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = HistoryMessage::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"user\""));
        let deserialized: HistoryMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, msg);
    }
}
