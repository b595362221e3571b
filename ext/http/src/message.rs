//! Request and response values exchanged with a transport adapter.
//!
//! A transport builds an [`HttpRequest`], hands it to
//! [`HttpEngine::handle`](crate::HttpEngine::handle), and gets an
//! [`HttpResponse`] back. In between, every field lives in the context under
//! the keys in [`keys`](crate::keys).

use crate::keys::{
    QUERY_PARAMETERS, REQUEST_BODY, REQUEST_HEADERS, REQUEST_METHOD, REQUEST_PATH,
    RESPONSE_BODY, RESPONSE_HEADERS, RESPONSE_STATUS,
};
use chainer::MetaData;
use std::collections::BTreeMap;

/// Header map with case-insensitive names.
///
/// Names are stored lowercased; iteration order is by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove a header.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// `(name, value)` pairs, names lowercased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Request
// ═══════════════════════════════════════════════════════════════════════════════

/// An inbound request as the transport saw it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    method: String,
    path: String,
    headers: Headers,
    query_params: BTreeMap<String, String>,
    body: String,
}

impl HttpRequest {
    /// Create a builder for `HttpRequest`.
    #[must_use]
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Get the HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Get the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a query parameter by name.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get the request body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Populate a fresh context. Every request key is set, even when empty.
    #[must_use]
    pub fn into_meta_data(self) -> MetaData {
        let mut md = MetaData::new();
        md.set(&REQUEST_METHOD, self.method);
        md.set(&REQUEST_PATH, self.path);
        md.set(&REQUEST_HEADERS, self.headers);
        md.set(&QUERY_PARAMETERS, self.query_params);
        md.set(&REQUEST_BODY, self.body);
        md
    }
}

/// Builder for `HttpRequest`.
#[derive(Debug, Default)]
pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    /// Set the HTTP method. Stored uppercased.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request.method = method.into().to_ascii_uppercase();
        self
    }

    /// Set the request path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request.path = path.into();
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name, value);
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.query_params.insert(name.into(), value.into());
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.request.body = body.into();
        self
    }

    /// Build the `HttpRequest`.
    #[must_use]
    pub fn build(self) -> HttpRequest {
        self.request
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Response
// ═══════════════════════════════════════════════════════════════════════════════

/// What the pipeline decided to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code; 200 when no step set one.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Response body; empty when no step set one.
    pub body: String,
}

impl HttpResponse {
    /// Take the response keys out of a finished context.
    #[must_use]
    pub fn from_meta_data(md: &mut MetaData) -> Self {
        Self {
            status: md.remove(&RESPONSE_STATUS).unwrap_or(200),
            headers: md.remove(&RESPONSE_HEADERS).unwrap_or_default(),
            body: md.remove(&RESPONSE_BODY).unwrap_or_default(),
        }
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(headers.contains("Content-type"));
        assert_eq!(headers.iter().next(), Some(("content-type", "text/plain")));
    }

    #[test]
    fn request_into_meta_data() {
        let request = HttpRequest::builder()
            .method("get")
            .path("/users")
            .header("Origin", "https://a.example")
            .query_param("page", "2")
            .build();
        assert_eq!(request.method(), "GET");

        let md = request.into_meta_data();
        assert_eq!(md.get(&REQUEST_METHOD).unwrap(), "GET");
        assert_eq!(md.get(&REQUEST_PATH).unwrap(), "/users");
        assert_eq!(
            md.get(&REQUEST_HEADERS).unwrap().get("origin"),
            Some("https://a.example")
        );
        assert_eq!(md.get(&QUERY_PARAMETERS).unwrap().get("page").unwrap(), "2");
        assert_eq!(md.get(&REQUEST_BODY).unwrap(), "");
    }

    #[test]
    fn response_defaults() {
        let response = HttpResponse::from_meta_data(&mut MetaData::new());
        assert_eq!(response.status, 200);
        assert!(response.headers.is_empty());
        assert!(response.body.is_empty());
    }
}
