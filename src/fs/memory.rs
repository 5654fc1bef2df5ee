//! In-memory filesystem
//!
//! Useful for embedding a small site in the binary and for exercising the
//! engine's error routing without touching the disk.

use super::{clean_path, File, FileSystem, FsError, Metadata};
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Seek};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Denied,
    Broken,
}

impl Failure {
    fn error(self) -> FsError {
        match self {
            Self::Denied => FsError::PermissionDenied,
            Self::Broken => FsError::Other(io::Error::other("simulated I/O failure")),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    data: Arc<[u8]>,
    modified: SystemTime,
    open_failure: Option<Failure>,
    stat_failure: Option<Failure>,
}

/// Map of absolute paths to file contents
///
/// Directories are implied: `/a` is a directory as soon as `/a/...` exists.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: HashMap<String, Entry>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the current time as modification time
    #[must_use]
    pub fn with_file(self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.with_file_at(path, data, SystemTime::now())
    }

    #[must_use]
    pub fn with_file_at(
        mut self,
        path: &str,
        data: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) -> Self {
        let data: Vec<u8> = data.into();
        self.files.insert(
            clean_path(path),
            Entry {
                data: Arc::from(data),
                modified,
                open_failure: None,
                stat_failure: None,
            },
        );
        self
    }

    /// Add a file whose `open` fails with permission denied
    #[must_use]
    pub fn with_denied(self, path: &str) -> Self {
        self.with_failure(path, Some(Failure::Denied), None)
    }

    /// Add a file whose `open` fails with a generic I/O error
    #[must_use]
    pub fn with_broken(self, path: &str) -> Self {
        self.with_failure(path, Some(Failure::Broken), None)
    }

    /// Add a file that opens but whose `stat` fails with permission denied
    #[must_use]
    pub fn with_unstatable(self, path: &str) -> Self {
        self.with_failure(path, None, Some(Failure::Denied))
    }

    fn with_failure(
        mut self,
        path: &str,
        open_failure: Option<Failure>,
        stat_failure: Option<Failure>,
    ) -> Self {
        self.files.insert(
            clean_path(path),
            Entry {
                data: Arc::from(Vec::<u8>::new()),
                modified: SystemTime::now(),
                open_failure,
                stat_failure,
            },
        );
        self
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };
        self.files.keys().any(|name| name.starts_with(&prefix))
    }
}

impl FileSystem for MemoryFs {
    fn open(&self, path: &str) -> Result<Box<dyn File>, FsError> {
        let cleaned = clean_path(path);
        let key = if cleaned.len() > 1 {
            cleaned.trim_end_matches('/')
        } else {
            cleaned.as_str()
        };

        if let Some(entry) = self.files.get(key) {
            if let Some(failure) = entry.open_failure {
                return Err(failure.error());
            }
            return Ok(Box::new(MemoryFile {
                cursor: Cursor::new(Arc::clone(&entry.data)),
                modified: Some(entry.modified),
                is_dir: false,
                stat_failure: entry.stat_failure,
            }));
        }

        if self.is_dir(key) {
            return Ok(Box::new(MemoryFile {
                cursor: Cursor::new(Arc::from(Vec::<u8>::new())),
                modified: None,
                is_dir: true,
                stat_failure: None,
            }));
        }

        Err(FsError::NotFound)
    }
}

struct MemoryFile {
    cursor: Cursor<Arc<[u8]>>,
    modified: Option<SystemTime>,
    is_dir: bool,
    stat_failure: Option<Failure>,
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl File for MemoryFile {
    fn stat(&self) -> Result<Metadata, FsError> {
        if let Some(failure) = self.stat_failure {
            return Err(failure.error());
        }
        Ok(Metadata {
            len: self.cursor.get_ref().len() as u64,
            modified: self.modified,
            is_dir: self.is_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file() {
        let fs = MemoryFs::new().with_file("/index.html", "<app/>");
        let mut file = fs.open("/index.html").unwrap();
        assert_eq!(file.stat().unwrap().len, 6);

        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "<app/>");
    }

    #[test]
    fn test_implied_directories() {
        let fs = MemoryFs::new().with_file("/assets/app.js", "x");
        assert!(fs.open("/assets").unwrap().stat().unwrap().is_dir);
        assert!(fs.open("/assets/").unwrap().stat().unwrap().is_dir);
        assert!(fs.open("/").unwrap().stat().unwrap().is_dir);
        assert!(matches!(fs.open("/asset"), Err(FsError::NotFound)));
    }

    #[test]
    fn test_empty_fs_root_is_missing() {
        assert!(matches!(MemoryFs::new().open("/"), Err(FsError::NotFound)));
    }

    #[test]
    fn test_failures() {
        let fs = MemoryFs::new()
            .with_denied("/private.html")
            .with_broken("/broken.html")
            .with_unstatable("/odd.html");

        assert!(matches!(
            fs.open("/private.html"),
            Err(FsError::PermissionDenied)
        ));
        assert!(matches!(fs.open("/broken.html"), Err(FsError::Other(_))));
        let file = fs.open("/odd.html").unwrap();
        assert!(matches!(file.stat(), Err(FsError::PermissionDenied)));
    }
}
