use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub mod memory;

pub use memory::MemoryFileSystem;

/// Filesystem operations needed by the caption and metadata pipelines
pub trait FileSystem {
    /// Read a whole file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create or truncate a file and write `contents` to it
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Create a directory and all missing parents; succeeds if it already exists
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Check whether `path` is an existing directory
    fn is_dir(&self, path: &Path) -> bool;

    /// List regular files below `root`, sorted by path.
    ///
    /// With `recursive == false` only the top level of `root` is listed.
    fn list_files(&self, root: &Path, recursive: bool) -> io::Result<Vec<PathBuf>>;
}

/// [`FileSystem`] backed by the real disk
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs_err::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        fs_err::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs_err::create_dir_all(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(&self, root: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
        // Surface a missing root as NotFound instead of an opaque walk error
        fs_err::metadata(root)?;

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                }
            }
        }

        Ok(files)
    }
}

/// Check whether a file name ends with `suffix`, ignoring ASCII case
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| {
            name.len() >= suffix.len()
                && name.is_char_boundary(name.len() - suffix.len())
                && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
        })
        .unwrap_or(false)
}
