//! Plain-text error responses

use crate::sink::ResponseSink;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use hyper::StatusCode;

/// Body text for an error status, e.g. `403 forbidden`
pub fn error_text(status: StatusCode) -> String {
    let reason = status.canonical_reason().unwrap_or("unknown status");
    format!("{} {}", status.as_u16(), reason.to_ascii_lowercase())
}

/// Answer with `status` and its plain-text reason
///
/// Any `Content-Length` set by an earlier step is dropped.
pub fn write_error(sink: &mut dyn ResponseSink, status: StatusCode) {
    let headers = sink.headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    sink.set_status(status);
    // best effort: a sink that refuses the body has nowhere else to report to
    let _ = sink.write(error_text(status).as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ResponseBuffer;

    #[test]
    fn test_error_text() {
        assert_eq!(error_text(StatusCode::NOT_FOUND), "404 not found");
        assert_eq!(error_text(StatusCode::FORBIDDEN), "403 forbidden");
        assert_eq!(
            error_text(StatusCode::INTERNAL_SERVER_ERROR),
            "500 internal server error"
        );
    }

    #[test]
    fn test_write_error() {
        let mut sink = ResponseBuffer::new();
        sink.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("9000"));
        write_error(&mut sink, StatusCode::FORBIDDEN);

        assert_eq!(sink.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(sink.body(), b"403 forbidden");
        assert!(!sink.headers().contains_key(CONTENT_LENGTH));
        assert_eq!(sink.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(sink.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
    }
}
