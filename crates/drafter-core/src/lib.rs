//! Drafter core domain: conversations, staged changes, and the shared error
//! type.
//!
//! This crate is pure data plus transition rules. It owns the
//! [`Conversation`](conversation::Conversation) and [`Change`](change::Change)
//! models exclusively; transport and persistence live in sibling crates and
//! talk to this one through the repository trait and the store API.

pub mod change;
pub mod conversation;
pub mod error;
pub mod repository;

// Re-export common types
pub use change::{Change, ChangedFile, PreviewMap};
pub use conversation::{
    ChatMessage, Conversation, ConversationContext, ConversationStatus, ConversationStore, Sender,
};
pub use error::{DrafterError, Result};
pub use repository::StagedChangeRepository;
