//! Error types for the check-in API client.
//!
//! # Design
//! Callers see one failure channel, `ApiError`. The two classes the UI cares
//! about are `Transport` (the round trip failed or returned a non-2xx status)
//! and `Logical` (the backend answered but the envelope code was not 200).
//! The remaining variants are local failures that never reached the backend
//! or happened after it answered successfully.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Errors returned by the request pipeline and the API wrappers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not complete or came back with a non-2xx status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The backend answered with an envelope whose code is not 200.
    #[error("{message}")]
    Logical { code: Option<i64>, message: String },

    /// The stored credential could not be read.
    #[error("credential lookup failed: {0}")]
    Credential(#[from] CredentialError),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The envelope data did not match the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Text shown to the user for failures that come from the backend.
    ///
    /// Local failures return `None`; they are not surfaced as notifications.
    pub fn user_message(&self, network_default: &str) -> Option<String> {
        match self {
            ApiError::Transport(err) => Some(
                err.server_message()
                    .unwrap_or_else(|| network_default.to_string()),
            ),
            ApiError::Logical { message, .. } => Some(message.clone()),
            _ => None,
        }
    }

    /// HTTP status for transport failures that carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Failures of the round trip itself.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network failure: {0}")]
    Network(String),

    #[error("HTTP {status}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// The `message` field of a JSON error body, when the server sent one.
    pub fn server_message(&self) -> Option<String> {
        let TransportError::Status { body, .. } = self else {
            return None;
        };
        let value: Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }
}

/// Failures reading the stored credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential store unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store malformed: {0}")]
    Malformed(String),
}

/// Failures loading a `PipelineConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
