//! The `{code, message, data}` wrapper every backend reply uses, and the
//! normalization of raw responses into it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, TransportError};
use crate::http::HttpResponse;

/// Envelope code for logical success.
pub const SUCCESS_CODE: i64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
    /// Envelope-level fields beyond the three above, such as a timestamp.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Envelope message, treating an empty string as absent.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    /// Decode `data` into a concrete type.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.data).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Turn a transport outcome into the single success/failure contract.
///
/// `operation_failed` is the message used when a 2xx reply carries no usable
/// envelope message.
pub fn normalize(
    outcome: Result<HttpResponse, TransportError>,
    operation_failed: &str,
) -> Result<Envelope, ApiError> {
    let response = outcome?;
    if !response.is_success() {
        return Err(TransportError::Status {
            status: response.status,
            body: response.body,
        }
        .into());
    }
    let envelope: Envelope = match serde_json::from_str(&response.body) {
        Ok(envelope) => envelope,
        Err(_) => {
            return Err(ApiError::Logical {
                code: None,
                message: operation_failed.to_string(),
            })
        }
    };
    if envelope.is_success() {
        return Ok(envelope);
    }
    Err(ApiError::Logical {
        code: Some(envelope.code),
        message: envelope.message().unwrap_or(operation_failed).to_string(),
    })
}
