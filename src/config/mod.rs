use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_FILE: &str = "subharvest.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input and output locations
    pub paths: PathsConfig,

    /// Caption extraction settings
    pub captions: CaptionsConfig,

    /// Descriptor aggregation settings
    pub metadata: MetadataConfig,

    /// External downloader settings
    pub downloader: DownloaderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding downloaded videos, captions and descriptor files
    pub videos_dir: PathBuf,

    /// Directory receiving extracted text and the metadata collection
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionsConfig {
    /// Caption file extension, without the dot
    pub extension: String,

    /// Appended to the identifier to name each text file
    pub output_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// File name suffix identifying descriptor files
    pub descriptor_suffix: String,

    /// Name of the aggregated collection inside the output directory
    pub output_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Path to the yt-dlp executable
    pub yt_dlp_path: String,

    /// yt-dlp search extractor prefix used to resolve uploader handles
    pub search_prefix: String,

    /// Base URL a video id is appended to
    pub video_url_base: String,

    /// Subtitle languages requested from the platform
    pub subtitle_langs: String,

    /// Subtitle format requested before conversion
    pub subtitle_format: String,

    /// Caption format subtitles are converted to
    pub convert_subtitles: String,

    /// Default number of search results
    pub max_results: usize,

    /// yt-dlp output template for downloaded files
    pub output_template: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            videos_dir: PathBuf::from("videos"),
            output_dir: PathBuf::from("text_data"),
        }
    }
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            extension: "srt".to_string(),
            output_suffix: "_text.txt".to_string(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            descriptor_suffix: ".info.json".to_string(),
            output_file: "video_metadata.json".to_string(),
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            search_prefix: "bilisearch".to_string(),
            video_url_base: "https://www.bilibili.com/video/".to_string(),
            subtitle_langs: "zh-CN".to_string(),
            subtitle_format: "vtt".to_string(),
            convert_subtitles: "srt".to_string(),
            max_results: 10,
            output_template: "%(id)s-%(title)s.%(ext)s".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults when none exists
    pub fn load() -> Result<Self> {
        match Self::config_path()? {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a specific configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Write configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Existing configuration file, if any
    fn config_path() -> Result<Option<PathBuf>> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        let user_config = Self::user_config_path()?;
        Ok(user_config.exists().then_some(user_config))
    }

    /// Per-user configuration file location
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("subharvest").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.captions.extension.trim_start_matches('.').is_empty() {
            anyhow::bail!("captions.extension must not be empty");
        }
        if self.captions.output_suffix.is_empty() {
            anyhow::bail!("captions.output_suffix must not be empty");
        }
        if self.metadata.descriptor_suffix.is_empty() {
            anyhow::bail!("metadata.descriptor_suffix must not be empty");
        }
        if self.metadata.output_file.is_empty() {
            anyhow::bail!("metadata.output_file must not be empty");
        }
        if self.downloader.max_results == 0 {
            anyhow::bail!("downloader.max_results must be at least 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Videos Dir: {}", self.paths.videos_dir.display());
        println!("  Output Dir: {}", self.paths.output_dir.display());
        println!("  Caption Extension: {}", self.captions.extension);
        println!("  Text Suffix: {}", self.captions.output_suffix);
        println!("  Descriptor Suffix: {}", self.metadata.descriptor_suffix);
        println!("  Metadata File: {}", self.metadata.output_file);
        println!("  yt-dlp: {}", self.downloader.yt_dlp_path);
        println!("  Search Prefix: {}", self.downloader.search_prefix);
        println!("  Subtitle Languages: {}", self.downloader.subtitle_langs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.captions.extension, "srt");
        assert_eq!(config.metadata.output_file, "video_metadata.json");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subharvest.yaml");
        fs_err::write(
            &path,
            "paths:\n  output_dir: corpus\ndownloader:\n  max_results: 3\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.paths.output_dir, PathBuf::from("corpus"));
        assert_eq!(config.paths.videos_dir, PathBuf::from("videos"));
        assert_eq!(config.downloader.max_results, 3);
        assert_eq!(config.downloader.search_prefix, "bilisearch");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subharvest.yaml");
        fs_err::write(&path, "captions:\n  extension: \"\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.downloader.subtitle_langs = "en".to_string();
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
