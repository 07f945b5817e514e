//! Subharvest - A Rust CLI tool for turning downloaded video subtitles into text corpora
//!
//! This library extracts plain text from timed-caption (SRT) files, aggregates per-video
//! descriptor files into a single metadata collection, and wraps the external `yt-dlp`
//! downloader that produces those files in the first place.

use std::path::PathBuf;

pub mod captions;
pub mod cli;
pub mod config;
pub mod metadata;
pub mod report;
pub mod sources;
pub mod storage;
pub mod utils;

pub use captions::batch::CaptionBatchProcessor;
pub use captions::{extract_text, CaptionBlock};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use metadata::{MetadataAggregator, VideoDescriptor};
pub use report::{BatchReport, ConsoleReporter, Reporter};
pub use sources::{VideoEntry, VideoSource};
pub use storage::{FileSystem, LocalFileSystem, MemoryFileSystem};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the harvester
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("Input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Failed to read {}: {}", path.display(), io_chain(source))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {}", path.display(), io_chain(source))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No caption text could be extracted from {}", .0.display())]
    NoCaptionText(PathBuf),

    #[error("Malformed descriptor {}: {source}", path.display())]
    MalformedDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0} is not available. Please install it: https://github.com/yt-dlp/yt-dlp")]
    ToolUnavailable(String),

    #[error("{tool} failed: {stderr}")]
    ToolFailed { tool: String, stderr: String },
}

/// Render an io error with its causes.
///
/// `fs_err` wraps the OS error in a message naming the path, and the cause that
/// explains the failure (permission denied, invalid UTF-8) only shows up in `source()`.
fn io_chain(error: &std::io::Error) -> String {
    let mut rendered = error.to_string();
    let mut cause = std::error::Error::source(error);
    while let Some(inner) = cause {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        cause = inner.source();
    }
    rendered
}

impl HarvestError {
    /// Build a read error, folding "not found" into [`HarvestError::MissingInput`]
    pub fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            HarvestError::MissingInput(path)
        } else {
            HarvestError::Read { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileSystem, LocalFileSystem};
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_read_error_names_the_cause() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BV001-a.srt");
        fs_err::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let source = LocalFileSystem::new().read_to_string(&path).unwrap_err();
        let err = HarvestError::from_read(&path, source);

        assert!(matches!(err, HarvestError::Read { .. }));
        assert!(err.to_string().contains("valid UTF-8"), "{}", err);
    }

    #[test]
    fn test_not_found_becomes_missing_input() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = HarvestError::from_read(Path::new("videos/x.srt"), source);
        assert!(matches!(err, HarvestError::MissingInput(_)));
    }

    #[test]
    fn test_io_chain_without_cause() {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert_eq!(io_chain(&error), "read-only");
    }
}
