//! Transport configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the transport channel.
///
/// Deployments override the defaults through the studio's TOML
/// configuration; durations are expressed in milliseconds on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Handshake deadline. A connection attempt that has not reached "open"
    /// by then is torn down and retried rather than left hanging.
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,
    /// Quiet period after open before the first keep-alive ping.
    #[serde(with = "duration_millis")]
    pub ping_settle_delay: Duration,
    /// Interval between keep-alive pings.
    #[serde(with = "duration_millis")]
    pub ping_interval: Duration,
    /// Delay before the first reconnect attempt; doubles per attempt.
    #[serde(with = "duration_millis")]
    pub base_delay: Duration,
    /// Reconnect attempt cap. Exceeding it is terminal for the channel.
    pub max_attempts: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            ping_settle_delay: Duration::from_secs(2),
            ping_interval: Duration::from_secs(30),
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
