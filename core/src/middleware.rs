//! Ordered request and response filters.
//!
//! # Design
//! Request filters run in order before the transport and may short-circuit
//! by returning an error. Response filters run in order on the normalized
//! outcome and may inspect it, rewrite it, or turn a success into a failure.
//! The built-in filters cover bearer auth, request/response logging and the
//! failure notification. A `Pipeline` keeps the last two in a separate chain
//! that runs after every other response filter.

use std::sync::Arc;

use crate::env::{CredentialStore, Notifier};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};

/// Outcome seen by response filters.
pub type Outcome = Result<Envelope, ApiError>;

pub trait RequestFilter: Send + Sync {
    fn on_request(&self, request: HttpRequest) -> Result<HttpRequest, ApiError>;
}

pub trait ResponseFilter: Send + Sync {
    fn on_response(&self, exchange: &Exchange, outcome: Outcome) -> Outcome;
}

/// What response filters know about the call that produced the outcome.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub method: HttpMethod,
    pub url: String,
    /// HTTP status when the transport produced a response.
    pub status: Option<u16>,
}

/// The middleware list owned by a pipeline.
#[derive(Clone, Default)]
pub struct Chain {
    request: Vec<Arc<dyn RequestFilter>>,
    response: Vec<Arc<dyn ResponseFilter>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_request(&mut self, filter: impl RequestFilter + 'static) {
        self.request.push(Arc::new(filter));
    }

    pub fn push_response(&mut self, filter: impl ResponseFilter + 'static) {
        self.response.push(Arc::new(filter));
    }

    pub fn apply_request(&self, request: HttpRequest) -> Result<HttpRequest, ApiError> {
        self.request
            .iter()
            .try_fold(request, |request, filter| filter.on_request(request))
    }

    pub fn apply_response(&self, exchange: &Exchange, outcome: Outcome) -> Outcome {
        self.response
            .iter()
            .fold(outcome, |outcome, filter| filter.on_response(exchange, outcome))
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .finish()
    }
}

/// Sets `Authorization: Bearer <token>` when a token is stored.
pub struct BearerAuth {
    credentials: Arc<dyn CredentialStore>,
    key: String,
}

impl BearerAuth {
    pub fn new(credentials: Arc<dyn CredentialStore>, key: impl Into<String>) -> Self {
        Self {
            credentials,
            key: key.into(),
        }
    }
}

impl RequestFilter for BearerAuth {
    fn on_request(&self, mut request: HttpRequest) -> Result<HttpRequest, ApiError> {
        if let Some(token) = self.credentials.read(&self.key)? {
            if !token.is_empty() {
                request.set_header("Authorization", format!("Bearer {token}"));
            }
        }
        Ok(request)
    }
}

/// Logs method, path and the effective parameters of each request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLog;

impl RequestFilter for RequestLog {
    fn on_request(&self, request: HttpRequest) -> Result<HttpRequest, ApiError> {
        let params = if !request.query.is_empty() {
            request
                .query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        } else {
            request.body.clone().unwrap_or_default()
        };
        tracing::info!(
            method = %request.method,
            path = %request.path,
            params = %params,
            authorized = request.header("authorization").is_some(),
            "api request"
        );
        Ok(request)
    }
}

/// Logs URL, status/code and message of each outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseLog;

impl ResponseFilter for ResponseLog {
    fn on_response(&self, exchange: &Exchange, outcome: Outcome) -> Outcome {
        match &outcome {
            Ok(envelope) => tracing::info!(
                method = %exchange.method,
                url = %exchange.url,
                code = envelope.code,
                detail = envelope.message().unwrap_or_default(),
                "api response"
            ),
            Err(ApiError::Logical { code, message }) => tracing::error!(
                method = %exchange.method,
                url = %exchange.url,
                status = ?exchange.status,
                code = ?code,
                detail = %message,
                "api logical failure"
            ),
            Err(ApiError::Transport(err)) => tracing::error!(
                method = %exchange.method,
                url = %exchange.url,
                status = ?exchange.status,
                detail = %err.server_message().unwrap_or_else(|| err.to_string()),
                "api transport failure"
            ),
            Err(err) => tracing::error!(
                method = %exchange.method,
                url = %exchange.url,
                error = %err,
                "api call failed"
            ),
        }
        outcome
    }
}

/// Raises one notification for each backend failure.
pub struct NotifyOnFailure {
    notifier: Arc<dyn Notifier>,
    network_default: String,
}

impl NotifyOnFailure {
    pub fn new(notifier: Arc<dyn Notifier>, network_default: impl Into<String>) -> Self {
        Self {
            notifier,
            network_default: network_default.into(),
        }
    }
}

impl ResponseFilter for NotifyOnFailure {
    fn on_response(&self, _exchange: &Exchange, outcome: Outcome) -> Outcome {
        if let Err(err) = &outcome {
            if let Some(message) = err.user_message(&self.network_default) {
                self.notifier.notify(&message);
            }
        }
        outcome
    }
}
