//! Pipeline configuration.
//!
//! Every field has a default matching the deployed backend, so an empty JSON
//! object is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Same-origin prefix used when the page is served from loopback.
    pub proxy_prefix: String,
    /// Scheme for direct backend access from another device.
    pub lan_scheme: String,
    /// Backend port for direct access.
    pub lan_port: u16,
    /// Per-request timeout ceiling.
    pub timeout_ms: u64,
    /// Key the bearer token is stored under.
    pub credential_key: String,
    /// Notification text for transport failures without a server message.
    pub network_error_message: String,
    /// Notification text for logical failures without an envelope message.
    pub operation_failed_message: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            proxy_prefix: "/api".to_string(),
            lan_scheme: "http".to_string(),
            lan_port: 8080,
            timeout_ms: 10_000,
            credential_key: "student_token".to_string(),
            network_error_message: "network error".to_string(),
            operation_failed_message: "operation failed".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
