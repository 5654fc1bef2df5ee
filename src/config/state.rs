// Application state module
// Shared, read-only state handed to every connection

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use super::types::Config;
use crate::handler::TryFiles;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Frozen try-files handler built from `[site]`
    pub handler: Arc<TryFiles>,
    /// Connections currently being served
    pub active_connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: Config, handler: TryFiles) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            active_connections: AtomicUsize::new(0),
        }
    }
}
