//! Conversation status types.

use serde::{Deserialize, Serialize};

/// The current position of a conversation in the change-review lifecycle.
///
/// `Open` is initial. `Thinking` is a transient, UI-only indicator and is
/// never persisted. `Closed` and `Cancelled` are terminal only for the
/// *current change*; the conversation returns to `Open` for further
/// messages afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Waiting for user input.
    Open,
    /// The assistant is busy; cleared by the next assistant message or an
    /// idle status frame.
    Thinking,
    /// A staged change is awaiting confirm or cancel.
    Review,
    /// The staged change was applied.
    Closed,
    /// The staged change was discarded.
    Cancelled,
}

impl ConversationStatus {
    /// Whether the conversation accepts a new user message in this state.
    pub fn accepts_input(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether a change is under review.
    pub fn in_review(&self) -> bool {
        matches!(self, Self::Review)
    }
}

impl Default for ConversationStatus {
    fn default() -> Self {
        Self::Open
    }
}
