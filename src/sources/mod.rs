use async_trait::async_trait;
use std::path::PathBuf;

pub mod ytdlp;

pub use ytdlp::YtDlpSource;

use crate::Result;

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEntry {
    /// Platform video identifier
    pub id: String,

    /// Video title as listed by the platform
    pub title: String,
}

/// What to fetch alongside a video
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory receiving the video, descriptor, thumbnail and captions
    pub output_dir: PathBuf,

    /// Also fetch subtitles converted to the caption format
    pub include_subtitles: bool,
}

/// Produces the files the caption and metadata pipelines consume.
///
/// Implementations are expected to leave `<id>-<title>.<ext>` files in the output
/// directory, including a descriptor (`.info.json`) and captions (`.srt`).
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Resolve an uploader handle to at most `max` videos
    async fn search(&self, handle: &str, max: usize) -> Result<Vec<VideoEntry>>;

    /// Download a single video and its side files
    async fn download(&self, video_id: &str, options: &DownloadOptions) -> Result<()>;

    /// Get the name of this platform
    fn platform_name(&self) -> &'static str;
}

/// Parse `<id> <title>` lines; lines without both parts are ignored
pub fn parse_search_output(stdout: &str) -> Vec<VideoEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let (id, title) = line.trim().split_once(char::is_whitespace)?;
            let title = title.trim();
            if id.is_empty() || title.is_empty() {
                return None;
            }
            Some(VideoEntry {
                id: id.to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}
