//! Static file serving
//!
//! The generic file server the try-files engine runs as its primary attempt,
//! plus the content and error writers shared with the fallback walk.

mod content;
mod error;

pub use content::serve_content;
pub use error::{error_text, write_error};

use crate::fs::{clean_path, File, FileSystem, FsError};
use crate::handler::Handler;
use crate::logger;
use crate::request::Request;
use crate::sink::ResponseSink;
use hyper::header::{HeaderValue, LOCATION};
use hyper::StatusCode;
use std::sync::Arc;

const INDEX_PAGE: &str = "index.html";

/// Serves files of a [`FileSystem`] by request path
///
/// Directories are answered with their `index.html`. There is deliberately no
/// listing: a directory without an index is a 404, so a try-files engine falls
/// back to its candidates instead of exposing the directory.
#[derive(Clone)]
pub struct StaticFileServer {
    fs: Arc<dyn FileSystem>,
}

impl StaticFileServer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    fn open(&self, sink: &mut dyn ResponseSink, path: &str) -> Option<(Box<dyn File>, bool)> {
        let opened = self
            .fs
            .open(path)
            .and_then(|file| file.stat().map(|meta| (file, meta.is_dir)));
        match opened {
            Ok(opened) => Some(opened),
            Err(e) => {
                if let FsError::Other(ref err) = e {
                    logger::log_error(&format!("Failed to open '{path}': {err}"));
                }
                write_error(sink, e.status());
                None
            }
        }
    }

    fn serve_index(&self, sink: &mut dyn ResponseSink, request: &Request, dir: &str) {
        let path = format!("{dir}{INDEX_PAGE}");
        let Some((mut file, is_dir)) = self.open(sink, &path) else {
            return;
        };
        if is_dir {
            write_error(sink, StatusCode::NOT_FOUND);
            return;
        }
        let modified = file.stat().ok().and_then(|meta| meta.modified);
        serve_content(sink, request, INDEX_PAGE, modified, file.as_mut());
    }
}

impl Handler for StaticFileServer {
    fn serve(&self, sink: &mut dyn ResponseSink, request: &Request) {
        if request.path.ends_with("/index.html") {
            local_redirect(sink, request, "./");
            return;
        }

        let path = clean_path(&request.path);
        let Some((mut file, is_dir)) = self.open(sink, &path) else {
            return;
        };

        if is_dir {
            if !request.path.ends_with('/') {
                let base = request.raw_path.rsplit('/').next().unwrap_or_default();
                local_redirect(sink, request, &format!("{base}/"));
                return;
            }
            drop(file);
            self.serve_index(sink, request, &path);
            return;
        }

        let modified = file.stat().ok().and_then(|meta| meta.modified);
        let name = path.rsplit('/').next().unwrap_or_default();
        serve_content(sink, request, name, modified, file.as_mut());
    }
}

/// 301 to a path relative to the current one, keeping the query
fn local_redirect(sink: &mut dyn ResponseSink, request: &Request, target: &str) {
    let location = match request.query.as_deref() {
        Some(query) => format!("{target}?{query}"),
        None => target.to_string(),
    };
    match HeaderValue::from_str(&location) {
        Ok(value) => {
            sink.headers_mut().insert(LOCATION, value);
            sink.set_status(StatusCode::MOVED_PERMANENTLY);
        }
        Err(_) => write_error(sink, StatusCode::BAD_REQUEST),
    }
}
