//! Request description
//!
//! [`RequestOptions`] is an owned, cloneable description of one call so
//! that a request rejected with 401 can be issued again after a refresh.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::Value;

use crate::error::MiniappError;

/// Everything but RFC 3986 unreserved characters is escaped in query parts.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// URL fragments that mark login, registration and other auth endpoints.
/// A 401 from one of these is a plain failure, never a refresh trigger.
const AUTH_URL_MARKERS: &[&str] = &["/login", "/auth", "/register"];

#[derive(Debug, Clone)]
pub struct RequestOptions {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    headers: HeaderMap,
    hide_error_toast: bool,
}

impl RequestOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            hide_error_toast: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Append one query pair.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append one query pair if `value` is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn query_pairs(mut self, pairs: &[(&str, &str)]) -> Self {
        self.query
            .extend(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, MiniappError> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Suppress the transient error notice for this call.
    pub fn hide_error_toast(mut self, hide: bool) -> Self {
        self.hide_error_toast = hide;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn json_body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn hides_error_toast(&self) -> bool {
        self.hide_error_toast
    }

    pub fn is_auth_endpoint(&self) -> bool {
        AUTH_URL_MARKERS.iter().any(|m| self.url.contains(m))
    }

    /// Absolute URL with the query string appended. Relative URLs are
    /// joined onto `base_url`.
    pub(crate) fn resolve_url(&self, base_url: &str) -> String {
        let mut url = self.url.clone();

        if !self.query.is_empty() {
            let query = self
                .query
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(k, QUERY_ENCODE_SET),
                        utf8_percent_encode(v, QUERY_ENCODE_SET)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            let separator = if url.contains('?') { '&' } else { '?' };
            url = format!("{url}{separator}{query}");
        }

        if url.starts_with("http") {
            return url;
        }

        let base = base_url.trim_end_matches('/');
        if url.starts_with('/') {
            format!("{base}{url}")
        } else {
            format!("{base}/{url}")
        }
    }
}
