//! Shadow sink pool
//!
//! Keeps released shadow cores around so the hot path does not allocate one
//! per request. The pool is an ordinary value injected into the handler; tests
//! can swap in [`NoPool`] to get a fresh core on every acquisition.

use super::shadow::ShadowSink;
use super::{ResponseSink, SinkState};
use parking_lot::Mutex;
use std::sync::Arc;

/// Idle cores kept by a default [`SinkPool`]
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// Per-request interception state, reused across requests
#[derive(Debug, Default)]
pub struct ShadowCore {
    state: SinkState,
    discarded: u64,
}

impl ShadowCore {
    pub const fn state(&self) -> SinkState {
        self.state
    }

    /// Body bytes swallowed after a 404
    pub const fn discarded(&self) -> u64 {
        self.discarded
    }

    pub(crate) fn set_state(&mut self, state: SinkState) {
        self.state = state;
    }

    pub(crate) fn add_discarded(&mut self, len: usize) {
        self.discarded = self.discarded.saturating_add(len as u64);
    }

    pub(crate) fn reset(&mut self) {
        self.state = SinkState::Pending;
        self.discarded = 0;
    }
}

/// Source of shadow cores
///
/// `put` always receives a core that has already been reset.
pub trait Pool: Send + Sync {
    fn get(&self) -> Box<ShadowCore>;

    fn put(&self, core: Box<ShadowCore>);

    /// Pre-populate with `count` cores
    fn warm_up(&self, count: usize) {
        let cores: Vec<_> = (0..count).map(|_| self.get()).collect();
        for core in cores {
            self.put(core);
        }
    }
}

/// Bounded free list of shadow cores
#[derive(Debug)]
pub struct SinkPool {
    idle: Mutex<Vec<Box<ShadowCore>>>,
    max_idle: usize,
}

impl SinkPool {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Number of cores currently waiting for reuse
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

impl Default for SinkPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool for SinkPool {
    fn get(&self) -> Box<ShadowCore> {
        self.idle.lock().pop().unwrap_or_default()
    }

    fn put(&self, core: Box<ShadowCore>) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(core);
        }
    }
}

impl<P: Pool + ?Sized> Pool for Arc<P> {
    fn get(&self) -> Box<ShadowCore> {
        (**self).get()
    }

    fn put(&self, core: Box<ShadowCore>) {
        (**self).put(core);
    }

    fn warm_up(&self, count: usize) {
        (**self).warm_up(count);
    }
}

/// Pool that never keeps anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPool;

impl Pool for NoPool {
    fn get(&self) -> Box<ShadowCore> {
        Box::default()
    }

    fn put(&self, _core: Box<ShadowCore>) {}
}

/// Result of [`acquire`]
pub enum Intercept<'a> {
    /// Fresh shadow sink holding a pooled core
    Pooled(ShadowSink<'a>),
    /// The given sink already was a shadow sink and is used as-is
    Nested(&'a mut dyn ResponseSink),
}

impl<'a> Intercept<'a> {
    pub fn sink(&mut self) -> &mut dyn ResponseSink {
        match self {
            Self::Pooled(shadow) => shadow,
            Self::Nested(sink) => &mut **sink,
        }
    }

    pub fn state(&self) -> SinkState {
        match self {
            Self::Pooled(shadow) => shadow.state(),
            Self::Nested(sink) => sink.shadow_state().unwrap_or_default(),
        }
    }

    /// Give up interception and get the wrapped sink back
    pub fn into_real(self) -> &'a mut dyn ResponseSink {
        match self {
            Self::Pooled(shadow) => shadow.into_real(),
            Self::Nested(sink) => sink,
        }
    }
}

/// Bind a shadow sink to `real`
///
/// A sink that already intercepts is not wrapped twice; nothing is taken from
/// the pool in that case.
pub fn acquire<'a>(pool: &'a dyn Pool, real: &'a mut dyn ResponseSink) -> Intercept<'a> {
    if real.shadow_state().is_some() {
        return Intercept::Nested(real);
    }
    Intercept::Pooled(ShadowSink::new(real, pool))
}
