//! Conversation domain module.
//!
//! This module contains the conversation domain model, message types, the
//! lifecycle status enum, and the conversation store with its transition
//! rules.
//!
//! # Module Structure
//!
//! - `context`: the project/app/file scope (`ConversationContext`)
//! - `message`: chat log types (`Sender`, `ChatMessage`)
//! - `status`: lifecycle status (`ConversationStatus`)
//! - `model`: the conversation entity (`Conversation`)
//! - `store`: the store and its invariants (`ConversationStore`)

mod context;
mod message;
mod model;
mod status;
mod store;

// Re-export public API
pub use context::ConversationContext;
pub use message::{ChatMessage, Sender};
pub use model::Conversation;
pub use status::ConversationStatus;
pub use store::ConversationStore;
