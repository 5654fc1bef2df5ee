//! Request model and rewriters
//!
//! The try-files engine works on a small owned request: method, decoded
//! path, the raw percent-encoded path, query and headers. A rewriter may
//! transform it once before any lookup happens.

use hyper::http::request::Parts;
use hyper::{HeaderMap, Method};
use percent_encoding::percent_decode_str;
use std::sync::Arc;

/// Request as seen by handlers
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Percent-decoded path, used for file lookup
    pub path: String,
    /// Path exactly as received on the wire
    pub raw_path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl Request {
    /// Build from a request target such as `/a%20b?x=1`
    pub fn new(method: Method, target: &str) -> Self {
        let (raw_path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method,
            path: decode_path(raw_path),
            raw_path: raw_path.to_string(),
            query,
            headers: HeaderMap::new(),
        }
    }

    /// GET request for `target`
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    /// Build from hyper request parts
    pub fn from_parts(parts: &Parts) -> Self {
        let raw_path = parts.uri.path();
        Self {
            method: parts.method.clone(),
            path: decode_path(raw_path),
            raw_path: raw_path.to_string(),
            query: parts.uri.query().map(ToString::to_string),
            headers: parts.headers.clone(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Header value as text, if present and valid
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// Percent-decode a path, keeping it as-is when it does not decode to UTF-8
fn decode_path(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map_or_else(|_| raw.to_string(), |decoded| decoded.into_owned())
}

/// Request transform applied once before lookup
pub type Rewrite = Arc<dyn Fn(Request) -> Request + Send + Sync>;

/// Remove `prefix` from the decoded and raw paths where present
///
/// # Examples
/// ```
/// use tryfiles::request::{strip_prefix, Request};
/// let rewrite = strip_prefix("/app");
/// assert_eq!(rewrite(Request::get("/app/users")).path, "/users");
/// assert_eq!(rewrite(Request::get("/other")).path, "/other");
/// ```
pub fn strip_prefix(prefix: impl Into<String>) -> Rewrite {
    let prefix = prefix.into();
    Arc::new(move |mut request: Request| {
        if prefix.is_empty() {
            return request;
        }
        if let Some(rest) = request.path.strip_prefix(prefix.as_str()) {
            request.path = rest.to_string();
        }
        if let Some(rest) = request.raw_path.strip_prefix(prefix.as_str()) {
            request.raw_path = rest.to_string();
        }
        request
    })
}

/// Remove `suffix` from the decoded and raw paths where present
pub fn strip_suffix(suffix: impl Into<String>) -> Rewrite {
    let suffix = suffix.into();
    Arc::new(move |mut request: Request| {
        if suffix.is_empty() {
            return request;
        }
        if let Some(rest) = request.path.strip_suffix(suffix.as_str()) {
            request.path = rest.to_string();
        }
        if let Some(rest) = request.raw_path.strip_suffix(suffix.as_str()) {
            request.raw_path = rest.to_string();
        }
        request
    })
}
