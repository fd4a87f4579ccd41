//! The I/O side of the pipeline.
//!
//! `Transport` performs exactly one round trip for a prepared request.
//! Non-2xx replies are returned as data; classifying them is the pipeline's
//! job. `UreqTransport` is the blocking executor used by the bundled client.

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_impl::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_impl {
    use std::time::Duration;

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Blocking transport built on a ureq agent.
    ///
    /// Proxy-relative targets such as `/api/...` are resolved against
    /// `origin`, the way a browser resolves them against the page. A request
    /// carrying its own timeout uses it; `timeout` covers the rest.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
        origin: Option<String>,
        timeout: Duration,
    }

    impl UreqTransport {
        pub fn new(timeout: Duration) -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(Some(timeout))
                .build()
                .new_agent();
            Self {
                agent,
                origin: None,
                timeout,
            }
        }

        /// Origin of the page, used to resolve relative targets.
        pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
            self.origin = Some(origin.into().trim_end_matches('/').to_string());
            self
        }

        fn absolute(&self, url: String) -> Result<String, TransportError> {
            if !url.starts_with('/') {
                return Ok(url);
            }
            match &self.origin {
                Some(origin) => Ok(format!("{origin}{url}")),
                None => Err(TransportError::Network(format!(
                    "relative target {url} needs a page origin"
                ))),
            }
        }

        fn map_error(err: ureq::Error, timeout: Duration) -> TransportError {
            match err {
                ureq::Error::Timeout(_) => TransportError::Timeout(timeout),
                ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    TransportError::Timeout(timeout)
                }
                other => TransportError::Network(other.to_string()),
            }
        }
    }

    impl std::fmt::Debug for UreqTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("UreqTransport")
                .field("origin", &self.origin)
                .field("timeout", &self.timeout)
                .finish_non_exhaustive()
        }
    }

    impl Transport for UreqTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            let url = self.absolute(request.url())?;
            let timeout = request.timeout.unwrap_or(self.timeout);
            let result = match request.method {
                HttpMethod::Get => {
                    let mut builder = self
                        .agent
                        .get(&url)
                        .config()
                        .timeout_global(Some(timeout))
                        .build();
                    for (name, value) in &request.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    builder.call()
                }
                HttpMethod::Post => {
                    let mut builder = self
                        .agent
                        .post(&url)
                        .config()
                        .timeout_global(Some(timeout))
                        .build();
                    for (name, value) in &request.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    match &request.body {
                        Some(body) => builder.send(body.as_bytes()),
                        None => builder.send_empty(),
                    }
                }
            };
            let mut response = result.map_err(|e| Self::map_error(e, timeout))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response
                .body_mut()
                .read_to_string()
                .map_err(|e| Self::map_error(e, timeout))?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

}
