//! Content serving
//!
//! Streams an already opened file with validators, conditional requests and
//! single byte ranges. The name only drives the Content-Type guess.

use super::error::write_error;
use crate::fs::File;
use crate::http::cache;
use crate::http::mime;
use crate::http::range::{parse_range_header, ByteRange, RangeSpec};
use crate::logger;
use crate::request::Request;
use crate::sink::ResponseSink;
use hyper::header::{
    HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use hyper::{Method, StatusCode};
use std::io::{self, SeekFrom};
use std::time::SystemTime;

/// Chunk size used when copying file bytes into the sink
const COPY_CHUNK: usize = 16 * 1024;

/// Serve `content` as the response body
///
/// `Content-Type` is only derived from `name` when no earlier step set it.
pub fn serve_content(
    sink: &mut dyn ResponseSink,
    request: &Request,
    name: &str,
    modified: Option<SystemTime>,
    content: &mut dyn File,
) {
    let size = match content_size(content) {
        Ok(size) => size,
        Err(e) => {
            logger::log_error(&format!("Failed to size '{name}': {e}"));
            write_error(sink, StatusCode::INTERNAL_SERVER_ERROR);
            return;
        }
    };

    let etag = cache::weak_etag(size, modified);
    let headers = sink.headers_mut();
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(mime::content_type_for(name)),
        );
    }
    if let Some(modified) = modified {
        if let Ok(value) = HeaderValue::from_str(&cache::http_date(modified)) {
            headers.insert(LAST_MODIFIED, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(ETAG, value);
    }
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    if is_fresh(request, &etag, modified) {
        let headers = sink.headers_mut();
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        sink.set_status(StatusCode::NOT_MODIFIED);
        return;
    }

    let (status, range) = match parse_range_header(request.header("range"), size) {
        RangeSpec::Unsatisfiable => {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                sink.headers_mut().insert(CONTENT_RANGE, value);
            }
            write_error(sink, StatusCode::RANGE_NOT_SATISFIABLE);
            return;
        }
        RangeSpec::Partial(range) => {
            if let Ok(value) = HeaderValue::from_str(&range.content_range(size)) {
                sink.headers_mut().insert(CONTENT_RANGE, value);
            }
            (StatusCode::PARTIAL_CONTENT, range)
        }
        RangeSpec::Full if size == 0 => {
            sink.headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(0u64));
            sink.set_status(StatusCode::OK);
            return;
        }
        RangeSpec::Full => (
            StatusCode::OK,
            ByteRange {
                start: 0,
                end: size - 1,
            },
        ),
    };

    sink.headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(range.len()));
    sink.set_status(status);

    if !request.is_head() {
        copy_range(sink, content, name, range);
    }
}

/// Size by seeking to the end, then rewind
fn content_size(content: &mut dyn File) -> io::Result<u64> {
    let size = content.seek(SeekFrom::End(0))?;
    content.seek(SeekFrom::Start(0))?;
    Ok(size)
}

/// Conditional GET/HEAD check; `If-None-Match` takes precedence
fn is_fresh(request: &Request, etag: &str, modified: Option<SystemTime>) -> bool {
    if request.method != Method::GET && request.method != Method::HEAD {
        return false;
    }
    match request.header("if-none-match") {
        Some(inm) => cache::check_etag_match(Some(inm), etag),
        None => cache::not_modified_since(request.header("if-modified-since"), modified),
    }
}

/// Copy `range` of `content` into the sink in fixed-size chunks
///
/// The status is already committed, so failures can only be logged.
fn copy_range(sink: &mut dyn ResponseSink, content: &mut dyn File, name: &str, range: ByteRange) {
    if let Err(e) = content.seek(SeekFrom::Start(range.start)) {
        logger::log_error(&format!("Failed to seek '{name}': {e}"));
        return;
    }

    let mut remaining = range.len();
    let mut buf = [0u8; COPY_CHUNK];
    while remaining > 0 {
        let want = usize::try_from(remaining).map_or(COPY_CHUNK, |r| r.min(COPY_CHUNK));
        let n = match content.read(&mut buf[..want]) {
            Ok(0) => {
                logger::log_warning(&format!(
                    "'{name}' ended {remaining} bytes early while streaming"
                ));
                return;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                logger::log_error(&format!("Failed to read '{name}': {e}"));
                return;
            }
        };
        if sink.write(&buf[..n]).is_err() {
            return;
        }
        remaining -= n as u64;
    }
}
