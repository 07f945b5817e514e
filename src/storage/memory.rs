use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use super::FileSystem;

/// In-memory [`FileSystem`] used to exercise the pipelines without touching disk
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<BTreeMap<PathBuf, String>>,
    dirs: RefCell<BTreeSet<PathBuf>>,
    read_only: RefCell<BTreeSet<PathBuf>>,
    unreadable: RefCell<BTreeSet<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.insert_dirs(parent);
        }
        self.files.borrow_mut().insert(path, contents.into());
        self
    }

    /// Add an empty directory
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.insert_dirs(path.as_ref());
        self
    }

    /// Make every write or directory creation at or below `path` fail
    pub fn deny_writes(self, path: impl Into<PathBuf>) -> Self {
        self.read_only.borrow_mut().insert(path.into());
        self
    }

    /// Make every read at or below `path` fail
    pub fn deny_reads(self, path: impl Into<PathBuf>) -> Self {
        self.unreadable.borrow_mut().insert(path.into());
        self
    }

    /// Current contents of a file
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    /// All files currently stored, sorted by path
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }

    fn insert_dirs(&self, path: &Path) {
        let mut dirs = self.dirs.borrow_mut();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        if self.read_only.borrow().iter().any(|ro| path.starts_with(ro)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only location: {}", path.display()),
            ));
        }
        Ok(())
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if self.unreadable.borrow().iter().any(|denied| path.starts_with(denied)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("unreadable location: {}", path.display()),
            ));
        }

        self.files.borrow().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display()))
        })
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.check_writable(path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.is_dir(parent) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such directory: {}", parent.display()),
                ));
            }
        }

        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check_writable(path)?;
        self.insert_dirs(path);
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.borrow().contains(path)
    }

    fn list_files(&self, root: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
        if !self.is_dir(root) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", root.display()),
            ));
        }

        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|path| {
                if recursive {
                    path.starts_with(root)
                } else {
                    path.parent() == Some(root)
                }
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_requires_parent_directory() {
        let fs = MemoryFileSystem::new();
        let err = fs.write(Path::new("out/a.txt"), "x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs.create_dir_all(Path::new("out")).unwrap();
        fs.write(Path::new("out/a.txt"), "x").unwrap();
        assert_eq!(fs.contents("out/a.txt").as_deref(), Some("x"));
    }

    #[test]
    fn test_denied_writes() {
        let fs = MemoryFileSystem::new().deny_writes("locked");
        assert!(fs.create_dir_all(Path::new("locked/sub")).is_err());
        assert!(!fs.is_dir(Path::new("locked")));
    }

    #[test]
    fn test_denied_reads() {
        let fs = MemoryFileSystem::new()
            .with_file("videos/a.srt", "x")
            .deny_reads("videos/a.srt");

        let err = fs.read_to_string(Path::new("videos/a.srt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(fs.list_files(Path::new("videos"), true).unwrap().len(), 1);
    }

    #[test]
    fn test_list_files_depth() {
        let fs = MemoryFileSystem::new()
            .with_file("videos/b.srt", "")
            .with_file("videos/a/c.srt", "")
            .with_file("other/d.srt", "");

        assert_eq!(
            fs.list_files(Path::new("videos"), true).unwrap(),
            vec![PathBuf::from("videos/a/c.srt"), PathBuf::from("videos/b.srt")]
        );
        assert_eq!(
            fs.list_files(Path::new("videos"), false).unwrap(),
            vec![PathBuf::from("videos/b.srt")]
        );
    }
}
