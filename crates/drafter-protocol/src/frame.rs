//! Wire frame types.
//!
//! One frame is one discrete JSON envelope exchanged over the duplex
//! channel, discriminated by a `type` field (legacy envelopes use `kind`;
//! the codec normalizes that before these types ever see the payload).

use crate::staging::ChangeProposal;
use drafter_core::Sender;
use serde::{Deserialize, Serialize};

/// Frames the client sends to the assistant backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// A user chat message.
    ChatMessage { text: String },
    /// Apply the staged change with the given id.
    ConfirmChanges { change_id: String },
    /// Keep-alive.
    Ping,
}

/// The assistant busy indicator carried by a `status` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantStatus {
    /// The assistant is working on a reply.
    Thinking,
    /// The assistant is idle.
    Idle,
}

/// Frames the assistant backend sends to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake complete.
    ConnectionEstablished,
    /// Assistant busy indicator.
    Status { status: AssistantStatus },
    /// Assistant (or echoed user) chat message.
    ChatMessage { sender: Sender, text: String },
    /// Proposes a staged change for review.
    ShowDiffModal(ChangeProposal),
    /// Recoverable error; the conversation stays usable.
    Error { message: String },
    /// Recoverable connection-level error; same handling as `Error`.
    ConnectionError { message: String },
    /// Keep-alive reply. Consumed and otherwise ignored.
    Pong,
    /// Keep-alive echo from the far end. Consumed and otherwise ignored.
    Ping,
}
