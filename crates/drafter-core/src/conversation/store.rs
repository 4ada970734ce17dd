//! Conversation store: the message log and staged change, plus the
//! transition rules the review controller applies.
//!
//! The store exclusively owns [`Conversation`] and [`Change`] data. It never
//! performs I/O; the controller converts protocol events into store
//! mutations, strictly in delivery order.

use super::context::ConversationContext;
use super::message::ChatMessage;
use super::model::Conversation;
use super::status::ConversationStatus;
use crate::change::Change;

/// Holds one conversation and enforces its data invariants.
///
/// Invariants:
/// - the message log is append-only,
/// - at most one change is staged at a time (a new one replaces the old),
/// - `status` is only written through [`set_status`](Self::set_status), and
///   the review controller is the only caller.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversation: Conversation,
}

impl ConversationStore {
    /// Creates a store holding a fresh conversation for the given context.
    pub fn new(context: ConversationContext) -> Self {
        Self {
            conversation: Conversation::new(context),
        }
    }

    /// Creates a store from an existing conversation snapshot.
    pub fn from_conversation(conversation: Conversation) -> Self {
        Self { conversation }
    }

    /// Read access to the conversation.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The context the conversation is bound to.
    pub fn context(&self) -> &ConversationContext {
        &self.conversation.context
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ConversationStatus {
        self.conversation.status
    }

    /// Records the backend-assigned conversation id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.conversation.id = Some(id.into());
    }

    /// Backend-assigned conversation id, if known.
    pub fn id(&self) -> Option<&str> {
        self.conversation.id.as_deref()
    }

    /// Sets the lifecycle status. Review-controller use only.
    pub fn set_status(&mut self, status: ConversationStatus) {
        self.conversation.status = status;
    }

    /// Appends a message to the log and returns a reference to it.
    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.conversation.messages.push(message);
        // Safe to unwrap because we just pushed an element
        self.conversation.messages.last().unwrap()
    }

    /// The full message log, in insertion order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.conversation.messages
    }

    /// Stages a change, replacing any previously staged one.
    ///
    /// Returns the replaced change, which the caller discards silently;
    /// proposals are never merged.
    pub fn stage(&mut self, change: Change) -> Option<Change> {
        self.conversation.staged_change.replace(change)
    }

    /// Clears the staged change, if any, and returns it.
    pub fn clear_staged(&mut self) -> Option<Change> {
        self.conversation.staged_change.take()
    }

    /// The change currently under review, if any.
    pub fn staged(&self) -> Option<&Change> {
        self.conversation.staged_change.as_ref()
    }

    /// Whether `change_id` references the currently staged change.
    ///
    /// A confirm or cancel carrying any other id is stale and must be
    /// ignored, not applied.
    pub fn staged_matches(&self, change_id: &str) -> bool {
        self.conversation
            .staged_change
            .as_ref()
            .is_some_and(|c| c.change_id == change_id)
    }
}
