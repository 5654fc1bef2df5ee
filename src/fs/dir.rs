//! Directory-backed filesystem

use super::{clean_path, File, FileSystem, FsError, Metadata};
use crate::logger;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

/// Filesystem rooted at a local directory
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request path below the root
    fn resolve(&self, path: &str) -> PathBuf {
        let cleaned = clean_path(path);
        let relative = cleaned.trim_start_matches('/');
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    /// Reject symlinks that lead outside the root
    fn check_contained(&self, path: &str, resolved: &Path) -> Result<(), FsError> {
        let root = self.root.canonicalize()?;
        let target = resolved.canonicalize()?;
        if target.starts_with(&root) {
            return Ok(());
        }
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            path,
            target.display()
        ));
        Err(FsError::NotFound)
    }
}

impl FileSystem for DirFs {
    fn open(&self, path: &str) -> Result<Box<dyn File>, FsError> {
        let resolved = self.resolve(path);
        self.check_contained(path, &resolved)?;
        let file = std::fs::File::open(&resolved)?;
        Ok(Box::new(DirFile(file)))
    }
}

struct DirFile(std::fs::File);

impl Read for DirFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Seek for DirFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }
}

impl File for DirFile {
    fn stat(&self) -> Result<Metadata, FsError> {
        let meta = self.0.metadata()?;
        Ok(Metadata {
            len: meta.len(),
            modified: meta.modified().ok(),
            is_dir: meta.is_dir(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<app/>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
        dir
    }

    #[test]
    fn test_open_and_read() {
        let dir = site();
        let fs = DirFs::new(dir.path());

        let mut file = fs.open("/assets/app.js").unwrap();
        let meta = file.stat().unwrap();
        assert_eq!(meta.len, 14);
        assert!(!meta.is_dir);
        assert!(meta.modified.is_some());

        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "console.log(1)");
    }

    #[test]
    fn test_directory_stat() {
        let dir = site();
        let fs = DirFs::new(dir.path());
        assert!(fs.open("/assets").unwrap().stat().unwrap().is_dir);
        assert!(fs.open("/").unwrap().stat().unwrap().is_dir);
    }

    #[test]
    fn test_missing_is_not_found() {
        let dir = site();
        let fs = DirFs::new(dir.path());
        assert!(matches!(fs.open("/nope.html"), Err(FsError::NotFound)));
        assert!(matches!(fs.open("/index.html/x"), Err(FsError::NotFound)));
    }

    #[test]
    fn test_dot_dot_stays_in_root() {
        let dir = site();
        let fs = DirFs::new(dir.path().join("assets"));
        // "/../index.html" is cleaned to "/index.html" below the assets root
        assert!(matches!(fs.open("/../index.html"), Err(FsError::NotFound)));
        assert!(fs.open("/../app.js").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_blocked() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        let dir = site();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("leak.txt"),
        )
        .unwrap();

        let fs = DirFs::new(dir.path());
        assert!(matches!(fs.open("/leak.txt"), Err(FsError::NotFound)));
    }
}
