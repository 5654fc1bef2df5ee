// Connection handling module
// Accepts a single TCP connection and serves it over HTTP/1.1

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::logger;
use crate::service;

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) {
    if !try_reserve_slot(state) {
        drop(stream);
        return;
    }

    if state.config.logging.access_log && logger::debug_enabled() {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Count the connection in, unless `max_connections` is already reached
fn try_reserve_slot(state: &AppState) -> bool {
    // Increment first, then check, so two racing accepts cannot both slip in
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);
    let Some(max_conn) = state.config.performance.max_connections else {
        return true;
    };
    if prev_count < usize::try_from(max_conn).unwrap_or(usize::MAX) {
        return true;
    }
    state.active_connections.fetch_sub(1, Ordering::SeqCst);
    logger::log_warning(&format!(
        "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
    ));
    false
}

/// Handle a single connection in a spawned task.
///
/// Keep-alive follows `performance.keep_alive_timeout`; the whole connection
/// is bounded by the larger of the read and write timeouts. The connection
/// counter is decremented when the task ends.
fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let timeout_duration = Duration::from_secs(std::cmp::max(
            performance.read_timeout,
            performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| service::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handler::TryFiles;

    fn state(max_connections: Option<u64>) -> AppState {
        let mut config = Config::load_from("no-such-config-file").unwrap();
        config.performance.max_connections = max_connections;
        AppState::new(config, TryFiles::new())
    }

    #[test]
    fn test_connection_limit() {
        let state = state(Some(2));
        assert!(try_reserve_slot(&state));
        assert!(try_reserve_slot(&state));
        assert!(!try_reserve_slot(&state));
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 2);

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
        assert!(try_reserve_slot(&state));
    }

    #[test]
    fn test_unlimited() {
        let state = state(None);
        for _ in 0..100 {
            assert!(try_reserve_slot(&state));
        }
    }
}
