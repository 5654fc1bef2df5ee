//! Shadow response sink
//!
//! Wraps the real sink for one primary serving attempt. A 404 status and the
//! body written after it are swallowed, leaving the real sink untouched so the
//! caller can still answer with something else.

use super::pool::{Pool, ShadowCore};
use super::{ResponseSink, SinkState};
use crate::logger;
use hyper::{HeaderMap, StatusCode};
use std::io;

/// Interception wrapper around a borrowed real sink
///
/// The pooled [`ShadowCore`] goes back to its pool when the shadow sink is
/// dropped or converted back with [`ShadowSink::into_real`].
pub struct ShadowSink<'a> {
    real: &'a mut dyn ResponseSink,
    slot: Slot<'a>,
}

/// Pooled core on loan; returned reset on drop
struct Slot<'a> {
    core: Option<Box<ShadowCore>>,
    pool: &'a dyn Pool,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let Some(mut core) = self.core.take() else {
            return;
        };
        if core.discarded() > 0 && logger::debug_enabled() {
            logger::log_debug(&format!(
                "Shadow sink discarded {} body bytes of a not-found response",
                core.discarded()
            ));
        }
        core.reset();
        self.pool.put(core);
    }
}

impl<'a> ShadowSink<'a> {
    pub(crate) fn new(real: &'a mut dyn ResponseSink, pool: &'a dyn Pool) -> Self {
        Self {
            real,
            slot: Slot {
                core: Some(pool.get()),
                pool,
            },
        }
    }

    /// Last observed status
    pub fn state(&self) -> SinkState {
        self.slot
            .core
            .as_ref()
            .map_or(SinkState::Pending, |core| core.state())
    }

    /// Release the pooled core and hand back the real sink
    pub fn into_real(self) -> &'a mut dyn ResponseSink {
        let Self { real, slot } = self;
        drop(slot);
        real
    }

    fn set_state(&mut self, state: SinkState) {
        if let Some(core) = self.slot.core.as_mut() {
            core.set_state(state);
        }
    }
}

impl ResponseSink for ShadowSink<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.real.headers_mut()
    }

    fn set_status(&mut self, status: StatusCode) {
        if status == StatusCode::NOT_FOUND {
            self.set_state(SinkState::Suppressed);
            return;
        }
        self.set_state(SinkState::Forwarded(status));
        self.real.set_status(status);
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.state() {
            SinkState::Suppressed => {
                if let Some(core) = self.slot.core.as_mut() {
                    core.add_discarded(data.len());
                }
                Ok(data.len())
            }
            SinkState::Pending => {
                self.set_state(SinkState::Forwarded(StatusCode::OK));
                self.real.write(data)
            }
            SinkState::Forwarded(_) => self.real.write(data),
        }
    }

    fn shadow_state(&self) -> Option<SinkState> {
        Some(self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ResponseBuffer, SinkPool};
    use hyper::header::CONTENT_TYPE;

    #[test]
    fn test_not_found_is_suppressed() {
        let pool = SinkPool::new();
        let mut real = ResponseBuffer::new();
        {
            let mut shadow = ShadowSink::new(&mut real, &pool);
            shadow
                .headers_mut()
                .insert(CONTENT_TYPE, "text/plain".parse().unwrap());
            shadow.set_status(StatusCode::NOT_FOUND);
            assert_eq!(shadow.write(b"404 not found").unwrap(), 13);
            assert_eq!(shadow.state(), SinkState::Suppressed);
        }
        assert!(!real.is_committed());
        assert!(real.body().is_empty());
        // headers are shared with the real sink and left for the caller to clean
        assert!(real.headers().contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_other_status_passes_through() {
        let pool = SinkPool::new();
        let mut real = ResponseBuffer::new();
        {
            let mut shadow = ShadowSink::new(&mut real, &pool);
            shadow.set_status(StatusCode::PARTIAL_CONTENT);
            shadow.write(b"abc").unwrap();
            assert_eq!(
                shadow.state(),
                SinkState::Forwarded(StatusCode::PARTIAL_CONTENT)
            );
        }
        assert_eq!(real.status(), Some(StatusCode::PARTIAL_CONTENT));
        assert_eq!(real.body(), b"abc");
    }

    #[test]
    fn test_implicit_ok_is_not_a_not_found() {
        let pool = SinkPool::new();
        let mut real = ResponseBuffer::new();
        let mut shadow = ShadowSink::new(&mut real, &pool);
        assert_eq!(shadow.state(), SinkState::Pending);
        assert!(!shadow.state().is_not_found());

        shadow.write(b"body").unwrap();
        assert_eq!(shadow.state(), SinkState::Forwarded(StatusCode::OK));
        let real = shadow.into_real();
        assert_eq!(real.shadow_state(), None);
    }

    #[test]
    fn test_status_after_not_found_is_forwarded() {
        let pool = SinkPool::new();
        let mut real = ResponseBuffer::new();
        {
            let mut shadow = ShadowSink::new(&mut real, &pool);
            shadow.set_status(StatusCode::NOT_FOUND);
            shadow.write(b"hidden").unwrap();
            shadow.set_status(StatusCode::OK);
            shadow.write(b"shown").unwrap();
        }
        assert_eq!(real.status(), Some(StatusCode::OK));
        assert_eq!(real.body(), b"shown");
    }

    #[test]
    fn test_core_returned_on_drop() {
        let pool = SinkPool::new();
        let mut real = ResponseBuffer::new();
        {
            let mut shadow = ShadowSink::new(&mut real, &pool);
            shadow.set_status(StatusCode::NOT_FOUND);
            shadow.write(b"x").unwrap();
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);
    }
}
