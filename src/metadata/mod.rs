//! Per-video descriptor aggregation.
//!
//! The downloader writes one `<id>-<title>.info.json` file per video. Only a fixed
//! subset of its fields is kept; [`VideoDescriptor`] spells that subset out together
//! with the value each field takes when it is absent or `null`:
//!
//! | field         | type          | default |
//! |---------------|---------------|---------|
//! | `id`          | string        | `""`    |
//! | `title`       | string        | `""`    |
//! | `uploader`    | string        | `""`    |
//! | `upload_date` | string        | `""`    |
//! | `description` | string        | `""`    |
//! | `view_count`  | integer       | `0`     |
//! | `like_count`  | integer       | `0`     |
//! | `tags`        | list of string| `[]`    |

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::config::MetadataConfig;
use crate::report::{BatchReport, Reporter};
use crate::storage::{has_suffix, FileSystem};
use crate::HarvestError;

/// The retained subset of a video descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoDescriptor {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(deserialize_with = "null_as_default")]
    pub uploader: String,

    /// `YYYYMMDD` as produced by the downloader
    #[serde(deserialize_with = "null_as_default")]
    pub upload_date: String,

    #[serde(deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(deserialize_with = "null_as_default")]
    pub view_count: u64,

    #[serde(deserialize_with = "null_as_default")]
    pub like_count: u64,

    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl VideoDescriptor {
    /// Parse a descriptor document; unknown fields are ignored
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

/// Serialize a collection as indented JSON, leaving non-ASCII text unescaped
pub fn to_pretty_json(entries: &[VideoDescriptor]) -> Result<String, HarvestError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Collects every descriptor file of a directory into one JSON array
pub struct MetadataAggregator<'a> {
    fs: &'a dyn FileSystem,
    reporter: &'a dyn Reporter,
    descriptor_suffix: String,
    output_file: String,
}

impl<'a> MetadataAggregator<'a> {
    pub const STAGE: &'static str = "metadata";

    pub fn new(fs: &'a dyn FileSystem, reporter: &'a dyn Reporter) -> Self {
        Self::from_config(fs, reporter, &MetadataConfig::default())
    }

    pub fn from_config(
        fs: &'a dyn FileSystem,
        reporter: &'a dyn Reporter,
        config: &MetadataConfig,
    ) -> Self {
        Self {
            fs,
            reporter,
            descriptor_suffix: config.descriptor_suffix.clone(),
            output_file: config.output_file.clone(),
        }
    }

    /// Aggregate the top-level descriptor files of `source_dir` into `output_dir`.
    ///
    /// Nothing is written when no descriptor could be parsed. Never fails.
    pub fn run(&self, source_dir: &Path, output_dir: &Path) -> BatchReport {
        let mut report = BatchReport::new(Self::STAGE);

        let files = match self.discover(source_dir) {
            Ok(files) => files,
            Err(e) => {
                self.reporter.notice(&e);
                self.reporter.stage_finished(&report);
                return report;
            }
        };

        report.total = files.len();
        self.reporter.stage_started(Self::STAGE, files.len());

        let mut entries = Vec::with_capacity(files.len());

        for (i, path) in files.iter().enumerate() {
            self.reporter.item_started(i + 1, files.len(), path);

            match self.load_descriptor(path) {
                Ok(descriptor) => {
                    entries.push(descriptor);
                    report.processed += 1;
                }
                Err(e) => {
                    let item = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    self.reporter.item_skipped(&item, &e);
                    report.skip(&item, &e);
                }
            }
        }

        if entries.is_empty() {
            tracing::info!("No valid descriptors under {}, nothing written", source_dir.display());
        } else {
            match self.write_collection(output_dir, &entries) {
                Ok(output) => {
                    self.reporter.item_saved(source_dir, &output);
                    report.written.push(output);
                }
                Err(e) => self.reporter.notice(&e),
            }
        }

        self.reporter.stage_finished(&report);
        report
    }

    fn discover(&self, source_dir: &Path) -> Result<Vec<PathBuf>, HarvestError> {
        let files = self
            .fs
            .list_files(source_dir, false)
            .map_err(|e| HarvestError::from_read(source_dir, e))?;

        Ok(files
            .into_iter()
            .filter(|path| has_suffix(path, &self.descriptor_suffix))
            .collect())
    }

    fn load_descriptor(&self, path: &Path) -> Result<VideoDescriptor, HarvestError> {
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| HarvestError::from_read(path, e))?;

        VideoDescriptor::from_json(&content).map_err(|source| HarvestError::MalformedDescriptor {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_collection(
        &self,
        output_dir: &Path,
        entries: &[VideoDescriptor],
    ) -> Result<PathBuf, HarvestError> {
        let output = output_dir.join(&self.output_file);
        let json = to_pretty_json(entries)?;

        self.fs
            .create_dir_all(output_dir)
            .and_then(|_| self.fs.write(&output, &json))
            .map_err(|source| HarvestError::Write {
                path: output.clone(),
                source,
            })?;

        Ok(output)
    }
}
