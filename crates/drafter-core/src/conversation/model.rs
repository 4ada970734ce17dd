//! Conversation domain model.

use super::context::ConversationContext;
use super::message::ChatMessage;
use super::status::ConversationStatus;
use crate::change::Change;
use serde::{Deserialize, Serialize};

/// A scoped session between a user and the assistant.
///
/// A conversation contains:
/// - The immutable project/app/file context it is bound to
/// - The append-only message log
/// - At most one staged change awaiting review
/// - The current lifecycle status
///
/// This is the "pure" domain model that the review controller operates on,
/// independent of transport or storage concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Opaque identifier, assigned by the assistant backend on creation.
    /// `None` until the create-conversation call returns.
    pub id: Option<String>,
    /// The scope this conversation is bound to.
    pub context: ConversationContext,
    /// Ordered message log; append-only.
    pub messages: Vec<ChatMessage>,
    /// The change currently under review, if any.
    pub staged_change: Option<Change>,
    /// Current lifecycle status.
    pub status: ConversationStatus,
}

impl Conversation {
    /// Creates an empty conversation in the `Open` state.
    pub fn new(context: ConversationContext) -> Self {
        Self {
            id: None,
            context,
            messages: Vec::new(),
            staged_change: None,
            status: ConversationStatus::Open,
        }
    }
}
