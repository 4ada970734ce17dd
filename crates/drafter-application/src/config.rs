//! Studio configuration.
//!
//! The embedding shell points the engine at its backend with a small TOML
//! file; a missing file means defaults.

use drafter_core::{DrafterError, Result};
use drafter_transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Embedding-level configuration for the review engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Base URL of the REST collaborators.
    pub api_base_url: String,
    /// Base URL of the duplex assistant channel.
    pub socket_base_url: String,
    /// Transport tunables.
    pub transport: TransportConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            socket_base_url: "ws://127.0.0.1:8000/ws".to_string(),
            transport: TransportConfig::default(),
        }
    }
}

impl StudioConfig {
    /// Loads the configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a present but invalid file is an
    /// error rather than a silent fallback.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        toml::from_str(&content).map_err(|err| DrafterError::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        })
    }
}
