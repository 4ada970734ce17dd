//! Events the transport channel delivers to its consumer.

use drafter_protocol::ServerFrame;
use std::time::Duration;

/// What the channel tells the review controller.
///
/// Events arrive on a single queue in strict delivery order; the controller
/// drains them one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The connection is open.
    Connected,
    /// A decoded server frame.
    Frame(ServerFrame),
    /// The connection dropped abnormally; a retry is scheduled after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// The connection closed normally; no retry will be made.
    Disconnected,
    /// The retry cap was exceeded. Terminal: the channel stops and the
    /// caller must take explicit action (e.g., a full reload).
    Exhausted { attempts: u32 },
    /// No credential was available. Terminal: the conversation stays
    /// read-only and the channel never connects.
    AuthMissing,
}
