//! Request handler module
//!
//! A handler answers one request by writing into a response sink. The
//! try-files engine, the static file server and the terminal handlers all
//! share this shape, so any of them can stand in for another.

mod tryfiles;

pub use tryfiles::{Outcome, TryFiles};

use crate::request::Request;
use crate::serve::write_error;
use crate::sink::ResponseSink;
use hyper::StatusCode;

/// Synchronous request handler
pub trait Handler: Send + Sync {
    fn serve(&self, sink: &mut dyn ResponseSink, request: &Request);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseSink, &Request) + Send + Sync,
{
    fn serve(&self, sink: &mut dyn ResponseSink, request: &Request) {
        self(sink, request);
    }
}

/// Plain-text `404 not found`
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Handler for NotFound {
    fn serve(&self, sink: &mut dyn ResponseSink, _request: &Request) {
        write_error(sink, StatusCode::NOT_FOUND);
    }
}
