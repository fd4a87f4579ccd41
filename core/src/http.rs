//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The request builders produce
//! `HttpRequest` values with a path relative to the backend root; the
//! pipeline fills in the resolved base address, headers and timeout, and a
//! `Transport` performs the round trip. All fields are owned so descriptors
//! can be logged, cloned and handed across threads freely.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// HTTP method for a request. The backend only uses GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `base_url` is empty until the pipeline prepares the request. It is either
/// an absolute origin (`http://192.168.1.5:8080`) or a proxy-relative prefix
/// (`/api`), in which case the transport resolves it against the page origin.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub base_url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            base_url: String::new(),
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Attach query parameters taken from the fields of `params`.
    pub fn with_query<T: Serialize>(mut self, params: &T) -> Result<Self, ApiError> {
        self.query = query_pairs(params)?;
        Ok(self)
    }

    /// Attach a JSON body and the matching content type.
    pub fn with_json<T: Serialize>(mut self, payload: &T) -> Result<Self, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.set_header("content-type", "application/json");
        self.body = Some(body);
        Ok(self)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a header, matching names case-insensitively.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    /// Full target: base address, path and encoded query string.
    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.base_url.trim_end_matches('/'), self.path);
        if !self.query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            url.push('?');
            url.push_str(&encoded);
        }
        url
    }
}

/// An HTTP response described as plain data, produced by a `Transport`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Flatten a serializable filter struct into query pairs.
///
/// `None` fields are skipped; scalars are rendered without JSON quoting and
/// nested values fall back to their JSON text.
pub fn query_pairs<T: Serialize>(params: &T) -> Result<Vec<(String, String)>, ApiError> {
    let value = serde_json::to_value(params).map_err(|e| ApiError::Serialization(e.to_string()))?;
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(ApiError::Serialization(format!(
                "query parameters must be an object, got {other}"
            )))
        }
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                nested => nested.to_string(),
            };
            Some((key, rendered))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Filter {
        keyword: Option<String>,
        page_num: u32,
        only_open: bool,
    }

    #[test]
    fn url_joins_base_path_and_query() {
        let mut req = HttpRequest::get("/public/activities");
        req.base_url = "http://192.168.1.5:8080/".to_string();
        req.query = vec![("keyword".to_string(), "art club".to_string())];
        assert_eq!(
            req.url(),
            "http://192.168.1.5:8080/public/activities?keyword=art+club"
        );
    }

    #[test]
    fn url_keeps_proxy_prefix_relative() {
        let mut req = HttpRequest::post("/h5/checkin");
        req.base_url = "/api".to_string();
        assert_eq!(req.url(), "/api/h5/checkin");
    }

    #[test]
    fn query_pairs_skip_none_and_render_scalars() {
        let filter = Filter {
            keyword: None,
            page_num: 2,
            only_open: true,
        };
        let pairs = query_pairs(&filter).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("onlyOpen".to_string(), "true".to_string()),
                ("pageNum".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn query_pairs_reject_non_objects() {
        let err = query_pairs(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut req = HttpRequest::get("/x");
        req.set_header("Authorization", "Bearer a");
        req.set_header("authorization", "Bearer b");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer b"));
    }

    #[test]
    fn with_json_sets_content_type() {
        let req = HttpRequest::post("/registration/register")
            .with_json(&serde_json::json!({"phone": "13800000000"}))
            .unwrap();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(r#"{"phone":"13800000000"}"#));
    }
}
