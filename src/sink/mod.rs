//! Response sink module
//!
//! A response sink is the write side of one HTTP exchange: a header map, a
//! status line and a body. Handlers write into a sink instead of returning a
//! finished `Response`, which lets the try-files engine interpose a shadow
//! sink and decide after the fact whether a 404 should reach the client.

mod pool;
mod shadow;

pub use pool::{acquire, Intercept, NoPool, Pool, ShadowCore, SinkPool, DEFAULT_MAX_IDLE};
pub use shadow::ShadowSink;

use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{HeaderMap, Response, StatusCode};
use std::io;

/// Interception state of a shadow sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkState {
    /// No status observed yet
    #[default]
    Pending,
    /// A 404 was observed and held back from the real sink
    Suppressed,
    /// A non-404 status was observed and forwarded
    Forwarded(StatusCode),
}

impl SinkState {
    /// Whether the last observed status was "not found"
    #[inline]
    pub const fn is_not_found(self) -> bool {
        matches!(self, Self::Suppressed)
    }
}

/// Write side of an HTTP response
pub trait ResponseSink: Send {
    /// Header map of the response. Headers must be set before the status.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commit the status line
    fn set_status(&mut self, status: StatusCode);

    /// Append body bytes, committing `200 OK` if no status was set yet
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Interception state, for sinks that are themselves shadow sinks
    fn shadow_state(&self) -> Option<SinkState> {
        None
    }
}

/// In-memory response sink turned into a hyper response once handling is done
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed status, `None` while the response is still untouched
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub const fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Build the hyper response. An untouched buffer becomes an empty `200 OK`.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for ResponseBuffer {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        if let Some(current) = self.status {
            logger::log_warning(&format!(
                "Superfluous status {} ignored, response already committed with {}",
                status.as_u16(),
                current.as_u16()
            ));
            return;
        }
        self.status = Some(status);
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::CONTENT_TYPE;

    #[test]
    fn test_first_status_wins() {
        let mut buf = ResponseBuffer::new();
        buf.set_status(StatusCode::FORBIDDEN);
        buf.set_status(StatusCode::OK);
        assert_eq!(buf.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_write_commits_ok() {
        let mut buf = ResponseBuffer::new();
        assert!(!buf.is_committed());
        buf.write(b"hello").unwrap();
        assert_eq!(buf.status(), Some(StatusCode::OK));
        assert_eq!(buf.body(), b"hello");
    }

    #[test]
    fn test_into_response() {
        let mut buf = ResponseBuffer::new();
        buf.headers_mut()
            .insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        buf.set_status(StatusCode::NOT_FOUND);
        buf.write(b"gone").unwrap();

        let resp = buf.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_state_not_found() {
        assert!(SinkState::Suppressed.is_not_found());
        assert!(!SinkState::Pending.is_not_found());
        assert!(!SinkState::Forwarded(StatusCode::OK).is_not_found());
    }
}
