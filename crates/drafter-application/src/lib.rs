//! Drafter application layer: the change review controller and its
//! observer contract.
//!
//! This crate glues the core store, the transport channel, the REST
//! collaborators, and the persistence shim into the conversation state
//! machine. The embedding shell constructs a controller per visible
//! conversation, registers an observer, and feeds it the channel's event
//! queue.

pub mod config;
pub mod controller;
pub mod events;

pub use config::StudioConfig;
pub use controller::ReviewController;
pub use events::{ConnectionNotice, ReviewEvent, ReviewObserver};
