//! HTTP service entry point
//!
//! Bridges hyper to the synchronous try-files handler: method check, request
//! conversion, handling on the blocking pool, then access logging.

use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::request::Request;
use crate::sink::ResponseBuffer;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::{Method, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// What the blocking half hands back
struct Served {
    response: Response<Full<Bytes>>,
    served_by: String,
    body_bytes: usize,
}

/// Main entry point for HTTP request handling
///
/// Request bodies are never read; only GET and HEAD reach the handler.
pub async fn handle_request<B>(
    req: hyper::Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let start = Instant::now();
    let (parts, _) = req.into_parts();

    let served = match check_http_method(&parts.method) {
        Some(response) => Served {
            response,
            served_by: "-".to_string(),
            body_bytes: 0,
        },
        None => serve(&state, &parts).await,
    };

    if state.config.logging.access_log {
        log_access(&state, &parts, peer, &served, start);
    }
    Ok(served.response)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Run the try-files handler off the reactor
async fn serve(state: &Arc<AppState>, parts: &Parts) -> Served {
    let request = Request::from_parts(parts);
    let handler = Arc::clone(&state.handler);

    let result = tokio::task::spawn_blocking(move || {
        let mut sink = ResponseBuffer::new();
        let outcome = handler.handle(&mut sink, request);
        let body_bytes = sink.body().len();
        Served {
            response: sink.into_response(),
            served_by: handler.describe(outcome),
            body_bytes,
        }
    })
    .await;

    result.unwrap_or_else(|e| {
        logger::log_error(&format!("Request handling task failed: {e}"));
        Served {
            response: http::build_500_response(),
            served_by: "-".to_string(),
            body_bytes: 0,
        }
    })
}

fn log_access(
    state: &AppState,
    parts: &Parts,
    peer: SocketAddr,
    served: &Served,
    start: Instant,
) {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.status = served.response.status().as_u16();
    entry.body_bytes = served.body_bytes;
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry.served_by.clone_from(&served.served_by);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fs::MemoryFs;
    use crate::handler::TryFiles;
    use http_body_util::BodyExt;
    use hyper::StatusCode;

    fn state() -> Arc<AppState> {
        let mut config = Config::load_from("no-such-config-file").unwrap();
        config.logging.access_log = false;
        let handler = TryFiles::new().fs(
            MemoryFs::new()
                .with_file("/index.html", "<app/>")
                .with_file("/robots.txt", "User-agent: *"),
            ["/index.html"],
        );
        Arc::new(AppState::new(config, handler))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn send(method: Method, uri: &str) -> Response<Full<Bytes>> {
        let req = hyper::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap();
        handle_request(req, state(), peer()).await.unwrap()
    }

    async fn body_of(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_serves_file() {
        let response = send(Method::GET, "/robots.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "User-agent: *");
    }

    #[tokio::test]
    async fn test_spa_fallback() {
        let response = send(Method::GET, "/settings/profile?tab=2").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/html; charset=utf-8"
        );
        assert_eq!(body_of(response).await, "<app/>");
    }

    #[tokio::test]
    async fn test_head() {
        let response = send(Method::HEAD, "/robots.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-length"], "13");
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_method_checks() {
        let response = send(Method::POST, "/robots.txt").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = send(Method::OPTIONS, "/").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["allow"], http::response::ALLOWED_METHODS);
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(Version::HTTP_11), "1.1");
        assert_eq!(version_label(Version::HTTP_2), "2");
    }
}
