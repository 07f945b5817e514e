use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::read_caption_text;
use crate::config::CaptionsConfig;
use crate::report::{BatchReport, Reporter};
use crate::storage::{has_suffix, FileSystem};
use crate::HarvestError;

/// Platform video ids: `BV` + 10 alphanumerics or legacy `av<digits>`,
/// optionally followed by a `_pN` part suffix
static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((?:BV[0-9A-Za-z]{10}|av\d+)(?:_p\d+)?)(?:[^0-9A-Za-z_]|$)")
        .expect("video id pattern is valid")
});

/// Derive the output identifier from a caption file name.
///
/// 1. A leading platform video id wins (`BV1xx411c7mD.zh-CN.srt` -> `BV1xx411c7mD`).
/// 2. Otherwise everything before the first `-` (`BV001-Title.en.srt` -> `BV001`).
/// 3. Otherwise everything before the first `.` (`intro.en.srt` -> `intro`).
pub fn derive_identifier(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(caps) = VIDEO_ID_RE.captures(&name) {
        return caps[1].to_string();
    }

    let head = match name.split_once('-') {
        Some((head, _)) => head,
        None => name.split('.').next().unwrap_or(&name),
    };

    if head.is_empty() {
        name
    } else {
        head.to_string()
    }
}

/// Turns every caption file under a directory tree into a `<id>_text.txt` file
pub struct CaptionBatchProcessor<'a> {
    fs: &'a dyn FileSystem,
    reporter: &'a dyn Reporter,
    extension: String,
    output_suffix: String,
}

impl<'a> CaptionBatchProcessor<'a> {
    pub const STAGE: &'static str = "captions";

    pub fn new(fs: &'a dyn FileSystem, reporter: &'a dyn Reporter) -> Self {
        Self::from_config(fs, reporter, &CaptionsConfig::default())
    }

    pub fn from_config(
        fs: &'a dyn FileSystem,
        reporter: &'a dyn Reporter,
        config: &CaptionsConfig,
    ) -> Self {
        Self {
            fs,
            reporter,
            extension: config.extension.trim_start_matches('.').to_string(),
            output_suffix: config.output_suffix.clone(),
        }
    }

    /// Process every caption file below `source_dir`, writing results into `output_dir`.
    ///
    /// Never fails: per-file problems are reported and recorded in the returned report.
    pub fn run(&self, source_dir: &Path, output_dir: &Path) -> BatchReport {
        let mut report = BatchReport::new(Self::STAGE);

        if let Err(source) = self.fs.create_dir_all(output_dir) {
            self.reporter.notice(&HarvestError::Write {
                path: output_dir.to_path_buf(),
                source,
            });
        }

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

        let mut seen_outputs = HashSet::new();

        for (i, path) in files.iter().enumerate() {
            self.reporter.item_started(i + 1, files.len(), path);
            let identifier = derive_identifier(path);

            match self.process_file(path, &identifier, output_dir) {
                Ok(output) => {
                    if !seen_outputs.insert(output.clone()) {
                        tracing::warn!(
                            "{} overwrites output of an earlier file with identifier {}",
                            path.display(),
                            identifier
                        );
                    }
                    self.reporter.item_saved(path, &output);
                    report.processed += 1;
                    report.written.push(output);
                }
                Err(e) => {
                    self.reporter.item_skipped(&identifier, &e);
                    report.skip(&identifier, &e);
                }
            }
        }

        self.reporter.stage_finished(&report);
        report
    }

    fn discover(&self, source_dir: &Path) -> Result<Vec<PathBuf>, HarvestError> {
        let suffix = format!(".{}", self.extension);
        let files = self
            .fs
            .list_files(source_dir, true)
            .map_err(|e| HarvestError::from_read(source_dir, e))?;

        Ok(files
            .into_iter()
            .filter(|path| has_suffix(path, &suffix))
            .collect())
    }

    fn process_file(
        &self,
        path: &Path,
        identifier: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, HarvestError> {
        let text = read_caption_text(self.fs, path)?;
        if text.is_empty() {
            return Err(HarvestError::NoCaptionText(path.to_path_buf()));
        }

        let output = output_dir.join(format!("{}{}", identifier, self.output_suffix));
        self.fs
            .write(&output, &text)
            .map_err(|source| HarvestError::Write {
                path: output.clone(),
                source,
            })?;

        Ok(output)
    }
}
