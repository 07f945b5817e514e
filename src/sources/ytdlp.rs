use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use super::{parse_search_output, DownloadOptions, VideoEntry, VideoSource};
use crate::config::DownloaderConfig;
use crate::{HarvestError, Result};

/// Video source backed by the `yt-dlp` command line tool.
///
/// Handles are resolved through yt-dlp's search extractor (`bilisearch10:<handle>`)
/// rather than a platform API, so swapping platforms is a configuration change.
pub struct YtDlpSource {
    config: DownloaderConfig,
}

impl YtDlpSource {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.config.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn search_args(&self, handle: &str, max: usize) -> Vec<String> {
        vec![
            format!("{}{}:{}", self.config.search_prefix, max, handle),
            "--flat-playlist".to_string(),
            "--print".to_string(),
            "%(id)s %(title)s".to_string(),
            "--no-download".to_string(),
        ]
    }

    fn download_args(&self, video_id: &str, options: &DownloadOptions) -> Vec<String> {
        let template = options.output_dir.join(&self.config.output_template);

        let mut args = vec![
            format!("{}{}", self.config.video_url_base, video_id),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--write-info-json".to_string(),
            "--write-thumbnail".to_string(),
        ];

        if options.include_subtitles {
            args.extend([
                "--write-auto-sub".to_string(),
                "--sub-format".to_string(),
                self.config.subtitle_format.clone(),
                "--sub-langs".to_string(),
                self.config.subtitle_langs.clone(),
                "--convert-subs".to_string(),
                self.config.convert_subtitles.clone(),
            ]);
        }

        args
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        if !self.check_availability().await {
            return Err(HarvestError::ToolUnavailable(self.config.yt_dlp_path.clone()).into());
        }

        tracing::debug!("Running {} {}", self.config.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.config.yt_dlp_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(HarvestError::ToolFailed {
                tool: self.config.yt_dlp_path.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    async fn search(&self, handle: &str, max: usize) -> Result<Vec<VideoEntry>> {
        tracing::info!("Searching videos for '{}'", handle);

        let stdout = self.run(&self.search_args(handle, max)).await?;
        let mut entries = parse_search_output(&stdout);
        entries.truncate(max);

        tracing::info!("Found {} video(s)", entries.len());
        Ok(entries)
    }

    async fn download(&self, video_id: &str, options: &DownloadOptions) -> Result<()> {
        tracing::info!("Downloading video: {}", video_id);

        fs_err::create_dir_all(&options.output_dir)?;
        self.run(&self.download_args(video_id, options)).await?;

        tracing::info!("Video {} downloaded", video_id);
        Ok(())
    }

    fn platform_name(&self) -> &'static str {
        "Bilibili"
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new(DownloaderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_search_args() {
        let source = YtDlpSource::default();
        let args = source.search_args("某UP主", 5);
        assert_eq!(args[0], "bilisearch5:某UP主");
        assert!(args.contains(&"--flat-playlist".to_string()));
        assert!(args.contains(&"%(id)s %(title)s".to_string()));
    }

    #[test]
    fn test_download_args_with_subtitles() {
        let source = YtDlpSource::default();
        let options = DownloadOptions {
            output_dir: PathBuf::from("videos"),
            include_subtitles: true,
        };
        let args = source.download_args("BV1xx411c7mD", &options);

        assert_eq!(args[0], "https://www.bilibili.com/video/BV1xx411c7mD");
        assert_eq!(
            args[2],
            PathBuf::from("videos")
                .join("%(id)s-%(title)s.%(ext)s")
                .to_string_lossy()
        );
        assert!(args.contains(&"--write-info-json".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "--convert-subs" && w[1] == "srt"));
        assert!(args.windows(2).any(|w| w[0] == "--sub-langs" && w[1] == "zh-CN"));
    }

    #[test]
    fn test_download_args_without_subtitles() {
        let source = YtDlpSource::default();
        let options = DownloadOptions {
            output_dir: PathBuf::from("videos"),
            include_subtitles: false,
        };
        let args = source.download_args("BV1xx411c7mD", &options);
        assert!(!args.iter().any(|a| a.starts_with("--sub") || a == "--write-auto-sub"));
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let source = YtDlpSource::new(DownloaderConfig {
            yt_dlp_path: "definitely-not-an-installed-tool".to_string(),
            ..Default::default()
        });

        assert!(!source.check_availability().await);

        let err = source.search("anyone", 3).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HarvestError>(),
            Some(HarvestError::ToolUnavailable(_))
        ));
    }
}
