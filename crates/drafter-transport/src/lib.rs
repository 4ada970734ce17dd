//! Drafter transport: the duplex assistant channel and its REST
//! collaborators.
//!
//! One logical connection per conversation context, maintained
//! transparently to the caller: connect with a handshake deadline,
//! keep-alive pings, bounded exponential reconnect, and deterministic
//! teardown. Everything the channel learns is delivered through a single
//! ordered event queue.

pub mod backoff;
pub mod channel;
pub mod config;
pub mod endpoint;
pub mod event;
pub mod rest;

pub use backoff::ReconnectBackoff;
pub use channel::{FrameSink, LinkState, TransportChannel};
pub use config::TransportConfig;
pub use endpoint::ChannelEndpoint;
pub use event::ChannelEvent;
pub use rest::{AssistantApi, AssistantBackend};
