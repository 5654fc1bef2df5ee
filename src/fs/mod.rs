//! Filesystem abstraction
//!
//! The try-files engine only needs to open a path, stat the handle and read
//! from it. Everything else (roots, traversal protection, where bytes come
//! from) belongs to the implementation.

mod dir;
mod memory;

pub use dir::DirFs;
pub use memory::MemoryFs;

use hyper::StatusCode;
use std::io::{self, Read, Seek};
use std::time::SystemTime;

/// Filesystem error, classified the way the engine routes it
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("file does not exist")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Other(io::Error),
}

impl FsError {
    /// HTTP status this error maps to
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other(err),
        }
    }
}

/// File metadata needed for serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

/// Open file handle; closed on drop
pub trait File: Read + Seek + Send {
    fn stat(&self) -> Result<Metadata, FsError>;
}

/// Read-only filesystem
pub trait FileSystem: Send + Sync {
    /// Open a slash-separated path rooted at the filesystem root
    fn open(&self, path: &str) -> Result<Box<dyn File>, FsError>;
}

/// Normalize a request path: leading slash, no empty, `.` or `..` segments
///
/// `..` never climbs above the root. A trailing slash is kept.
///
/// # Examples
/// ```
/// use tryfiles::fs::clean_path;
/// assert_eq!(clean_path("a/./b/../c"), "/a/c");
/// assert_eq!(clean_path("/../../etc/passwd"), "/etc/passwd");
/// assert_eq!(clean_path("/docs/"), "/docs/");
/// ```
pub fn clean_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            _ => stack.push(part),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for part in &stack {
        cleaned.push('/');
        cleaned.push_str(part);
    }
    if cleaned.is_empty() || (path.ends_with('/') && !stack.is_empty()) {
        cleaned.push('/');
    }
    cleaned
}
