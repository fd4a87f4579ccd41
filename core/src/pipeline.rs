//! The request pipeline: base address, filter chain and normalization.
//!
//! # Design
//! `Pipeline` never touches the network. `prepare` turns a relative request
//! into one ready for the wire, `finish` turns whatever the transport
//! produced into the single `Result<Envelope, ApiError>` contract, and
//! `execute` strings the two together around a `Transport`. Response logging
//! and failure notification always run last, after any appended response
//! filter, so they see the final outcome. Failures have already been notified
//! when `finish` returns.

use std::sync::Arc;

use crate::base_url::BaseUrl;
use crate::config::PipelineConfig;
use crate::env::Environment;
use crate::envelope::{self, Envelope};
use crate::error::{ApiError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::middleware::{
    BearerAuth, Chain, Exchange, NotifyOnFailure, RequestFilter, RequestLog, ResponseFilter,
    ResponseLog,
};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct Pipeline {
    base: BaseUrl,
    config: PipelineConfig,
    env: Environment,
    chain: Chain,
    /// Response logging and notification, applied after `chain`.
    reporting: Chain,
}

impl Pipeline {
    /// Build a pipeline with the default chain: bearer auth and request
    /// logging outbound, response logging and failure notification inbound.
    pub fn new(config: PipelineConfig, env: Environment) -> Self {
        let base = BaseUrl::resolve(&env.host().hostname(), &config);
        let mut chain = Chain::new();
        chain.push_request(BearerAuth::new(
            Arc::clone(env.credentials()),
            config.credential_key.clone(),
        ));
        chain.push_request(RequestLog);
        let mut reporting = Chain::new();
        reporting.push_response(ResponseLog);
        reporting.push_response(NotifyOnFailure::new(
            Arc::clone(env.notifier()),
            config.network_error_message.clone(),
        ));
        Self {
            base,
            config,
            env,
            chain,
            reporting,
        }
    }

    /// Append a request filter after the built-in ones.
    pub fn with_request_filter(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.chain.push_request(filter);
        self
    }

    /// Append a response filter. Response filters run in the order added,
    /// before response logging and failure notification.
    pub fn with_response_filter(mut self, filter: impl ResponseFilter + 'static) -> Self {
        self.chain.push_response(filter);
        self
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Attach the base address and timeout, then run the request filters.
    pub fn prepare(&self, mut request: HttpRequest) -> Result<HttpRequest, ApiError> {
        request.base_url = self.base.as_str().to_string();
        request.timeout = Some(self.config.timeout());
        self.chain.apply_request(request).inspect_err(|err| {
            tracing::error!(error = %err, "api request rejected before sending");
        })
    }

    /// Normalize a transport outcome and run the response filters.
    pub fn finish(
        &self,
        request: &HttpRequest,
        outcome: Result<HttpResponse, TransportError>,
    ) -> Result<Envelope, ApiError> {
        let exchange = Exchange {
            method: request.method,
            url: request.url(),
            status: outcome.as_ref().ok().map(|r| r.status),
        };
        let normalized = envelope::normalize(outcome, &self.config.operation_failed_message);
        let outcome = self.chain.apply_response(&exchange, normalized);
        self.reporting.apply_response(&exchange, outcome)
    }

    /// One full call: prepare, send once, finish. Never retries.
    pub fn execute<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: HttpRequest,
    ) -> Result<Envelope, ApiError> {
        let request = self.prepare(request)?;
        let outcome = transport.send(&request);
        self.finish(&request, outcome)
    }

    /// Rewrite a media URL for the page host.
    pub fn format_image_url(&self, url: &str) -> String {
        self.env.format_image_url(url)
    }
}
