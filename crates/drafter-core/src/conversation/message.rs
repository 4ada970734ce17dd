//! Chat message types.

use serde::{Deserialize, Serialize};

/// Represents the sender of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

/// A single message in the conversation log.
///
/// The log is append-only and insertion order is significant. Connection and
/// processing errors are appended as assistant-sender messages so the user
/// always has an in-context explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent the message.
    pub sender: Sender,
    /// The message text.
    pub text: String,
    /// Timestamp when the message was appended (ISO 8601 format).
    pub timestamp: String,
}

impl ChatMessage {
    /// Creates a user message stamped with the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Self::now(Sender::User, text)
    }

    /// Creates an assistant message stamped with the current time.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::now(Sender::Assistant, text)
    }

    fn now(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
