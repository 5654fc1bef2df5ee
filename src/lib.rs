//! Try-files static file handler
//!
//! Serves a request from a filesystem; when the file is missing, tries an
//! ordered list of fallback files (an SPA entry point, typically) and finally
//! hands the request to a terminal handler. The file server's own 404 is
//! intercepted by a pooled shadow sink and never reaches the client.
//!
//! ```
//! use tryfiles::fs::MemoryFs;
//! use tryfiles::handler::TryFiles;
//! use tryfiles::request::Request;
//! use tryfiles::sink::ResponseBuffer;
//!
//! let site = MemoryFs::new()
//!     .with_file("/index.html", "<app/>")
//!     .with_file("/app.js", "boot()");
//! let handler = TryFiles::new().fs(site, ["/index.html"]);
//!
//! let mut sink = ResponseBuffer::new();
//! handler.handle(&mut sink, Request::get("/settings/profile"));
//! assert_eq!(sink.body(), b"<app/>");
//! ```

pub mod config;
pub mod fs;
pub mod handler;
pub mod http;
pub mod logger;
pub mod request;
pub mod serve;
pub mod server;
pub mod service;
pub mod sink;

pub use handler::{Handler, NotFound, Outcome, TryFiles};
pub use request::Request;
pub use sink::{ResponseBuffer, ResponseSink};
