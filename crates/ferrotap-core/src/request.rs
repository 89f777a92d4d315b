//! Request descriptors.
//!
//! A [`RequestDescriptor`] is built once per call and consumed by the signer.
//! The query string and the JSON body are serialized here and nowhere else,
//! so the bytes that are signed are the bytes that are sent.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::http_client::{HttpAuth, HttpMethod, HttpRequest};

/// Method, location, ordered query parameters, body and headers of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub base_url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            base_url: base_url.into(),
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, base_url, path)
    }

    /// Append a query parameter; insertion order is the wire order.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Serialize `payload` as compact JSON, once.
    pub fn with_json_body<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_string(payload)?);
        Ok(self)
    }

    /// URL-encoded query string without the leading `?`.
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Path relative to the base URL with any trailing slash removed.
    ///
    /// Accepts both `/v3/trades` and an absolute `https://host/v3/trades/`.
    pub fn relative_path(&self) -> &str {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.strip_prefix(base).unwrap_or(&self.path);
        path.trim_end_matches('/')
    }

    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.base_url.trim_end_matches('/'), self.relative_path());
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query_string());
        }
        url
    }

    /// Turn the descriptor into the transport request, attaching `auth` last.
    pub fn into_http_request(self, auth: &HttpAuth, timeout_ms: u64) -> HttpRequest {
        let mut request = HttpRequest::new(self.method, self.url()).with_timeout_ms(timeout_ms);
        request.headers = self.headers;
        if let Some(body) = self.body {
            request = request.with_body(body);
        }
        request.with_auth(auth)
    }
}
