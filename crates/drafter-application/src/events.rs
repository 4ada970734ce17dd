//! Observer events.
//!
//! The UI (or any collaborator) registers a [`ReviewObserver`] when the
//! controller is constructed and receives typed events from then on. There
//! is no ambient global callback hook to stash handlers on.

use drafter_core::{Change, ChatMessage, ConversationStatus};
use std::time::Duration;

/// Connection lifecycle notices surfaced to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionNotice {
    /// The channel is open.
    Connected,
    /// The channel dropped; a retry fires after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// The channel closed normally.
    Disconnected,
    /// The retry cap was exceeded; explicit user action is required.
    Exhausted { attempts: u32 },
    /// No credential; the conversation stays read-only.
    AuthMissing,
}

/// Typed events the controller emits to its observer.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewEvent {
    /// A message was appended to the conversation log.
    MessageAppended(ChatMessage),
    /// The conversation status changed.
    StatusChanged(ConversationStatus),
    /// A change was staged for review, replacing any prior one.
    DiffStaged(Change),
    /// A change persisted by a previous session was re-staged at start.
    /// Shown for review, never applied automatically.
    DiffRestored(Change),
    /// The staged change was cleared (confirmed, cancelled, or discarded).
    DiffCleared { change_id: String },
    /// Connection lifecycle notice.
    Connection(ConnectionNotice),
}

/// Receives controller events, synchronously and in order.
pub trait ReviewObserver: Send + Sync {
    /// Called once per event.
    fn on_event(&self, event: ReviewEvent);
}
