use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::HarvestError;

/// Receives everything a batch run wants to tell the operator.
///
/// Batch functions never return errors; every non-fatal condition goes through here.
#[cfg_attr(test, mockall::automock)]
pub trait Reporter {
    /// A batch stage found `total` candidate files
    fn stage_started(&self, stage: &str, total: usize);

    /// File `position` of `total` (1-based) is about to be processed
    fn item_started(&self, position: usize, total: usize, path: &Path);

    /// An output file was written for `input`
    fn item_saved(&self, input: &Path, output: &Path);

    /// `item` produced no output
    fn item_skipped(&self, item: &str, error: &HarvestError);

    /// A condition not tied to a single item, such as a missing source directory or an
    /// unwritable output directory
    fn notice(&self, error: &HarvestError);

    /// The stage is over
    fn stage_finished(&self, report: &BatchReport);
}

/// One input that did not produce output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Identifier or file name of the skipped input
    pub item: String,

    /// Human-readable reason
    pub reason: String,
}

/// Outcome of one batch stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Stage name ("captions", "metadata")
    pub stage: String,

    /// Number of candidate files discovered
    pub total: usize,

    /// Output files written
    pub written: Vec<PathBuf>,

    /// Inputs contributing an entry (for aggregating stages this differs from `written`)
    pub processed: usize,

    /// Inputs that produced nothing
    pub skipped: Vec<SkippedItem>,
}

impl BatchReport {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn skip(&mut self, item: &str, error: &HarvestError) {
        self.skipped.push(SkippedItem {
            item: item.to_string(),
            reason: error.to_string(),
        });
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Identifiers of the skipped inputs, in processing order
    pub fn skipped_items(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.item.as_str()).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} of {} processed, {} skipped",
            self.stage,
            self.processed,
            self.total,
            self.skipped_count()
        )
    }
}

/// Reporter that logs through `tracing` and draws a progress bar on the terminal
pub struct ConsoleReporter {
    quiet: bool,
    progress: RefCell<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            progress: RefCell::new(None),
        }
    }

    /// Run `f` with the progress bar hidden so log lines don't tear it
    fn log(&self, f: impl FnOnce()) {
        match self.progress.borrow().as_ref() {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn stage_started(&self, stage: &str, total: usize) {
        tracing::info!("{}: found {} file(s)", stage, total);

        if self.quiet || total == 0 {
            return;
        }

        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        *self.progress.borrow_mut() = Some(bar);
    }

    fn item_started(&self, position: usize, total: usize, path: &Path) {
        self.log(|| tracing::info!("[{}/{}] Processing file: {}", position, total, path.display()));

        if let Some(bar) = self.progress.borrow().as_ref() {
            bar.set_position(position.saturating_sub(1) as u64);
            if let Some(name) = path.file_name() {
                bar.set_message(name.to_string_lossy().into_owned());
            }
        }
    }

    fn item_saved(&self, input: &Path, output: &Path) {
        self.log(|| tracing::debug!("Extracted {}", input.display()));
        self.log(|| tracing::info!("Saved: {}", output.display()));
    }

    fn item_skipped(&self, item: &str, error: &HarvestError) {
        self.log(|| tracing::warn!("Skipped {}: {}", item, error));
    }

    fn notice(&self, error: &HarvestError) {
        self.log(|| tracing::warn!("{}", error));
    }

    fn stage_finished(&self, report: &BatchReport) {
        if let Some(bar) = self.progress.borrow_mut().take() {
            bar.finish_and_clear();
        }

        let marker = if report.skipped.is_empty() {
            style("✓").green()
        } else {
            style("!").yellow()
        };
        println!("{} {}", marker, report.summary());

        for skipped in &report.skipped {
            println!("   • {} ({})", style(&skipped.item).bold(), skipped.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut report = BatchReport::new("captions");
        report.total = 3;
        report.processed = 2;
        report.skip("BV002", &HarvestError::NoCaptionText(PathBuf::from("BV002-x.srt")));

        assert_eq!(report.summary(), "captions: 2 of 3 processed, 1 skipped");
        assert_eq!(report.skipped_items(), vec!["BV002"]);
        assert!(report.skipped[0].reason.contains("BV002-x.srt"));
    }

    #[test]
    fn test_quiet_reporter_has_no_progress_bar() {
        let reporter = ConsoleReporter::new(true);
        reporter.stage_started("captions", 5);
        assert!(reporter.progress.borrow().is_none());
        reporter.stage_finished(&BatchReport::new("captions"));
    }
}
