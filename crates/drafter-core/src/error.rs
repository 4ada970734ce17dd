//! Error types for the Drafter engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Drafter engine.
///
/// Transport, protocol, and persistence layers all surface failures through
/// this enum so callers can match on the taxonomy instead of parsing strings.
/// Only `AuthMissing` and `ConnectionExhausted` are terminal; everything else
/// is translated into a state transition or a scheduled retry.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrafterError {
    /// No credential is available. The conversation stays in a read-only,
    /// non-connecting state until the caller obtains a token.
    #[error("authentication credential missing")]
    AuthMissing,

    /// The connection handshake exceeded its deadline.
    #[error("connection timed out after {timeout_ms}ms")]
    ConnectionTimeout { timeout_ms: u64 },

    /// The reconnection attempt cap was exceeded. The channel stops retrying;
    /// the caller must take explicit action (e.g., a full reload).
    #[error("connection attempts exhausted after {attempts} tries")]
    ConnectionExhausted { attempts: u32 },

    /// The channel is not open. The caller should retry after reconnect
    /// completes; messages are never silently queued across reconnects.
    #[error("not connected")]
    NotConnected,

    /// A wire payload could not be parsed. Dropped and logged, never fatal.
    #[error("malformed frame: {reason}")]
    MalformedFrame { reason: String },

    /// A confirm or cancel referenced a change that is no longer the staged
    /// one. Ignored, logged.
    #[error("stale change reference: '{change_id}'")]
    StaleChangeReference { change_id: String },

    /// Normalization of a change proposal produced no files.
    #[error("change proposal contained no files")]
    EmptyChangeSet,

    /// Explicit error frame from the assistant backend. The conversation
    /// remains usable.
    #[error("assistant error: {message}")]
    Server { message: String },

    /// A REST collaborator call failed (non-401 HTTP failure or transport).
    #[error("backend request failed: {message}")]
    Backend { message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", etc.
        message: String,
    },

    /// An operation was attempted in a state that does not allow it, e.g. a
    /// duplicate confirm while one is already in flight.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Data access error (repository/storage layer)
    #[error("data access error: {0}")]
    DataAccess(String),

    /// Internal error (should not happen in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl DrafterError {
    /// Creates a MalformedFrame error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Creates a StaleChangeReference error
    pub fn stale(change_id: impl Into<String>) -> Self {
        Self::StaleChangeReference {
            change_id: change_id.into(),
        }
    }

    /// Creates a Server error from an error frame message
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Creates a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is an AuthMissing error
    pub fn is_auth_missing(&self) -> bool {
        matches!(self, Self::AuthMissing)
    }

    /// Check if this is a NotConnected error
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }

    /// Check if this error is terminal for the channel.
    ///
    /// Terminal errors require caller-visible action (re-login or reload);
    /// everything else resolves through a state transition or retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthMissing | Self::ConnectionExhausted { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for DrafterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for DrafterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, DrafterError>`.
pub type Result<T> = std::result::Result<T, DrafterError>;
