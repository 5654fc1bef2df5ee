//! Try-files engine
//!
//! Serves a request from the filesystem, then from an ordered list of
//! fallback files, then through a terminal handler. The primary attempt runs
//! through a shadow sink so its 404 never reaches the client.

use super::{Handler, NotFound};
use crate::fs::{FileSystem, FsError};
use crate::logger;
use crate::request::{self, Request, Rewrite};
use crate::serve::{serve_content, write_error, StaticFileServer};
use crate::sink::{self, Pool, ResponseSink, SinkPool};
use hyper::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use hyper::StatusCode;
use std::sync::Arc;

/// Which step produced the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The file server answered with something other than 404
    Primary,
    /// Fallback candidate at this index was served
    Candidate(usize),
    /// Fallback candidate at this index failed and its error was sent
    CandidateError(usize, StatusCode),
    /// The terminal handler answered
    Terminal,
}

enum Attempt {
    Missing,
    Served,
    Failed(StatusCode),
}

/// Try-files handler
///
/// Built with the consuming methods below, then shared behind an `Arc`.
///
/// # Examples
/// ```
/// use tryfiles::fs::MemoryFs;
/// use tryfiles::handler::TryFiles;
/// use tryfiles::request::Request;
/// use tryfiles::sink::ResponseBuffer;
///
/// let handler = TryFiles::new().fs(MemoryFs::new().with_file("/index.html", "<app/>"), ["/index.html"]);
/// let mut sink = ResponseBuffer::new();
/// handler.handle(&mut sink, Request::get("/users/42"));
/// assert_eq!(sink.body(), b"<app/>");
/// ```
pub struct TryFiles {
    fs: Option<Arc<dyn FileSystem>>,
    server: Option<Arc<dyn Handler>>,
    custom_server: bool,
    candidates: Vec<String>,
    terminal: Arc<dyn Handler>,
    rewrite: Option<Rewrite>,
    pool: Arc<dyn Pool>,
}

impl Default for TryFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFiles {
    /// No filesystem, `/index.html` fallback, plain 404 terminal
    pub fn new() -> Self {
        Self {
            fs: None,
            server: None,
            custom_server: false,
            candidates: vec!["/index.html".to_string()],
            terminal: Arc::new(NotFound),
            rewrite: None,
            pool: Arc::new(SinkPool::new()),
        }
    }

    /// Set the backing filesystem
    ///
    /// A non-empty `candidates` list whose first entry is non-empty replaces
    /// the fallback list; otherwise the current list is kept.
    #[must_use]
    pub fn fs<F, I, S>(self, fs: F, candidates: I) -> Self
    where
        F: FileSystem + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_fs(Arc::new(fs), candidates)
    }

    /// Same as [`TryFiles::fs`] for an already shared filesystem
    #[must_use]
    pub fn shared_fs<I, S>(mut self, fs: Arc<dyn FileSystem>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let candidates: Vec<String> = candidates.into_iter().map(Into::into).collect();
        if candidates.first().is_some_and(|first| !first.is_empty()) {
            self.candidates = candidates;
        }
        if !self.custom_server {
            self.server = Some(Arc::new(StaticFileServer::new(Arc::clone(&fs))));
        }
        self.fs = Some(fs);
        self
    }

    /// Replace the fallback list; an empty list disables the walk
    #[must_use]
    pub fn try_files<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn not_found(mut self, handler: impl Handler + 'static) -> Self {
        self.terminal = Arc::new(handler);
        self
    }

    /// Set the request rewriter, replacing any earlier one
    #[must_use]
    pub fn rewrite<F>(mut self, rewrite: F) -> Self
    where
        F: Fn(Request) -> Request + Send + Sync + 'static,
    {
        self.rewrite = Some(Arc::new(rewrite));
        self
    }

    #[must_use]
    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.rewrite = Some(request::strip_prefix(prefix));
        self
    }

    #[must_use]
    pub fn strip_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.rewrite = Some(request::strip_suffix(suffix));
        self
    }

    /// Replace the file server used for the primary attempt
    #[must_use]
    pub fn file_server(mut self, handler: impl Handler + 'static) -> Self {
        self.server = Some(Arc::new(handler));
        self.custom_server = true;
        self
    }

    #[must_use]
    pub fn pool(mut self, pool: impl Pool + 'static) -> Self {
        self.pool = Arc::new(pool);
        self
    }

    /// Pre-populate the shadow sink pool
    pub fn warm_up(&self, count: usize) {
        self.pool.warm_up(count);
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn has_fs(&self) -> bool {
        self.fs.is_some()
    }

    /// Short label for access logs
    pub fn describe(&self, outcome: Outcome) -> String {
        let candidate = |index: usize| self.candidates.get(index).map_or("?", String::as_str);
        match outcome {
            Outcome::Primary => "file".to_string(),
            Outcome::Candidate(index) => format!("try:{}", candidate(index)),
            Outcome::CandidateError(index, status) => {
                format!("try:{}:{}", candidate(index), status.as_u16())
            }
            Outcome::Terminal => "terminal".to_string(),
        }
    }

    /// Answer `request` into `sink`
    pub fn handle(&self, sink: &mut dyn ResponseSink, request: Request) -> Outcome {
        let request = match self.rewrite {
            Some(ref rewrite) => rewrite(request),
            None => request,
        };

        let (Some(fs), Some(server)) = (self.fs.as_deref(), self.server.as_deref()) else {
            self.terminal.serve(sink, &request);
            return Outcome::Terminal;
        };

        let mut intercept = sink::acquire(self.pool.as_ref(), sink);
        server.serve(intercept.sink(), &request);
        if !intercept.state().is_not_found() {
            return Outcome::Primary;
        }

        let real = intercept.into_real();
        let headers = real.headers_mut();
        headers.remove(CONTENT_TYPE);
        headers.remove(X_CONTENT_TYPE_OPTIONS);

        for (index, name) in self.candidates.iter().enumerate() {
            match try_candidate(fs, real, &request, name) {
                Attempt::Missing => {}
                Attempt::Served => {
                    if logger::debug_enabled() {
                        logger::log_debug(&format!(
                            "{} served by fallback {name}",
                            request.path
                        ));
                    }
                    return Outcome::Candidate(index);
                }
                Attempt::Failed(status) => return Outcome::CandidateError(index, status),
            }
        }

        if logger::debug_enabled() {
            logger::log_debug(&format!("{} fell through to the terminal handler", request.path));
        }
        self.terminal.serve(real, &request);
        Outcome::Terminal
    }
}

impl Handler for TryFiles {
    fn serve(&self, sink: &mut dyn ResponseSink, request: &Request) {
        self.handle(sink, request.clone());
    }
}

/// Open, stat and serve one fallback candidate
fn try_candidate(
    fs: &dyn FileSystem,
    sink: &mut dyn ResponseSink,
    request: &Request,
    name: &str,
) -> Attempt {
    let opened = fs
        .open(name)
        .and_then(|file| file.stat().map(|meta| (file, meta)));
    let (mut file, meta) = match opened {
        Ok(opened) => opened,
        Err(FsError::NotFound) => return Attempt::Missing,
        Err(e) => {
            let status = e.status();
            logger::log_warning(&format!("Fallback {name} failed: {e}"));
            write_error(sink, status);
            return Attempt::Failed(status);
        }
    };
    if meta.is_dir {
        logger::log_warning(&format!("Fallback {name} is a directory"));
        write_error(sink, StatusCode::INTERNAL_SERVER_ERROR);
        return Attempt::Failed(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let base = name.rsplit('/').next().unwrap_or(name);
    serve_content(sink, request, base, meta.modified, file.as_mut());
    Attempt::Served
}
