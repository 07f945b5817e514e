//! Timed-caption (SRT) parsing.
//!
//! A caption file is a sequence of blocks:
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:02,500
//! First line
//! second line
//!
//! 2
//! ...
//! ```
//!
//! [`parse_blocks`] walks the lines with a small state machine and drops malformed
//! blocks instead of failing ([`scan_blocks`] also counts them); [`extract_text`]
//! flattens the blocks into one string.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::storage::FileSystem;
use crate::HarvestError;

pub mod batch;

static TIMING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{2}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2},\d{3})")
        .expect("timing pattern is valid")
});

static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("markup pattern is valid"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Caption timestamp with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    millis: u64,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Invalid caption timestamp: {0}")]
pub struct ParseTimestampError(String);

impl Timestamp {
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }
}

impl FromStr for Timestamp {
    type Err = ParseTimestampError;

    /// Parse `HH:MM:SS,mmm`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseTimestampError(s.to_string());

        let (clock, millis) = s.split_once(',').ok_or_else(invalid)?;
        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() != 3 || millis.len() != 3 {
            return Err(invalid());
        }

        let field = |text: &str| -> Result<u64, ParseTimestampError> {
            if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            text.parse().map_err(|_| invalid())
        };

        let hours = field(parts[0])?;
        let minutes = field(parts[1])?;
        let seconds = field(parts[2])?;
        let millis = field(millis)?;

        Ok(Self::from_millis(
            hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis,
        ))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_seconds = self.millis / 1000;
        write!(
            f,
            "{:02}:{:02}:{:02},{:03}",
            total_seconds / 3600,
            (total_seconds % 3600) / 60,
            total_seconds % 60,
            self.millis % 1000
        )
    }
}

/// One caption entry as it appears in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionBlock {
    pub index: u64,
    pub start: Timestamp,
    pub end: Timestamp,

    /// Raw text lines joined with `\n`, markup untouched
    pub text: String,
}

impl CaptionBlock {
    /// Text with markup removed and whitespace collapsed
    pub fn cleaned_text(&self) -> String {
        clean_caption_text(&self.text)
    }
}

enum ParseState<'a> {
    AwaitIndex,
    AwaitTiming {
        index: u64,
    },
    InText {
        index: u64,
        start: Timestamp,
        end: Timestamp,
        lines: Vec<&'a str>,
        after_blank: bool,
    },
}

fn parse_index(line: &str) -> Option<u64> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

fn parse_timing(line: &str) -> Option<(Timestamp, Timestamp)> {
    let caps = TIMING_RE.captures(line)?;
    let start = caps[1].parse().ok()?;
    let end = caps[2].parse().ok()?;
    Some((start, end))
}

fn finish_block(index: u64, start: Timestamp, end: Timestamp, lines: &[&str]) -> CaptionBlock {
    CaptionBlock {
        index,
        start,
        end,
        text: lines.join("\n").trim_end().to_string(),
    }
}

/// Result of scanning caption content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionScan {
    /// Well-formed blocks in source order
    pub blocks: Vec<CaptionBlock>,

    /// Index lines that were not followed by a valid timing line
    pub malformed: usize,
}

/// Parse caption content into blocks, in source order.
///
/// A block's text runs until a blank line followed by an index line, or the end of
/// the content. An index line that is not followed by a timing line is dropped.
pub fn parse_blocks(content: &str) -> Vec<CaptionBlock> {
    scan_blocks(content).blocks
}

/// Like [`parse_blocks`], also counting the blocks that had to be dropped
pub fn scan_blocks(content: &str) -> CaptionScan {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut blocks = Vec::new();
    let mut malformed = 0;
    let mut state = ParseState::AwaitIndex;

    for line in content.lines() {
        let blank = line.trim().is_empty();

        state = match state {
            ParseState::AwaitIndex => match parse_index(line) {
                Some(index) => ParseState::AwaitTiming { index },
                None => ParseState::AwaitIndex,
            },
            ParseState::AwaitTiming { index } => {
                if blank {
                    ParseState::AwaitTiming { index }
                } else if let Some((start, end)) = parse_timing(line) {
                    ParseState::InText {
                        index,
                        start,
                        end,
                        lines: Vec::new(),
                        after_blank: false,
                    }
                } else {
                    tracing::debug!("Dropping caption block {}: bad timing line {:?}", index, line);
                    malformed += 1;
                    match parse_index(line) {
                        Some(next) => ParseState::AwaitTiming { index: next },
                        None => ParseState::AwaitIndex,
                    }
                }
            }
            ParseState::InText {
                index,
                start,
                end,
                mut lines,
                after_blank,
            } => {
                if blank {
                    ParseState::InText {
                        index,
                        start,
                        end,
                        lines,
                        after_blank: true,
                    }
                } else if let (true, Some(next)) = (after_blank, parse_index(line)) {
                    blocks.push(finish_block(index, start, end, &lines));
                    ParseState::AwaitTiming { index: next }
                } else {
                    if after_blank && !lines.is_empty() {
                        lines.push("");
                    }
                    lines.push(line);
                    ParseState::InText {
                        index,
                        start,
                        end,
                        lines,
                        after_blank: false,
                    }
                }
            }
        };
    }

    if let ParseState::InText {
        index,
        start,
        end,
        lines,
        ..
    } = state
    {
        blocks.push(finish_block(index, start, end, &lines));
    } else if let ParseState::AwaitTiming { index } = state {
        tracing::debug!("Dropping caption block {}: no timing line", index);
        malformed += 1;
    }

    CaptionScan { blocks, malformed }
}

/// Remove `<...>` markup, collapse whitespace runs to one space and trim
pub fn clean_caption_text(text: &str) -> String {
    let without_markup = MARKUP_RE.replace_all(text, "");
    WHITESPACE_RE
        .replace_all(&without_markup, " ")
        .trim()
        .to_string()
}

/// Flatten caption content into a single space-separated string.
///
/// Returns an empty string when no well-formed block is present.
pub fn extract_text(content: &str) -> String {
    join_text(&parse_blocks(content))
}

fn join_text(blocks: &[CaptionBlock]) -> String {
    blocks
        .iter()
        .map(CaptionBlock::cleaned_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read a caption file through `fs` and flatten it.
///
/// A missing file is [`HarvestError::MissingInput`]; an empty result is returned as-is
/// so the caller decides what "no text" means. Dropped blocks are logged as a warning.
pub fn read_caption_text(fs: &dyn FileSystem, path: &Path) -> Result<String, HarvestError> {
    let content = fs
        .read_to_string(path)
        .map_err(|e| HarvestError::from_read(path, e))?;

    let scan = scan_blocks(&content);
    if scan.malformed > 0 {
        tracing::warn!(
            "Dropped {} malformed caption block(s) in {}",
            scan.malformed,
            path.display()
        );
    }
    Ok(join_text(&scan.blocks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryFileSystem;

    const THREE_BLOCKS: &str = concat!(
        "1\n00:00:01,000 --> 00:00:02,000\nfirst\n\n",
        "2\n00:00:02,000 --> 00:00:03,500\nsecond\n\n",
        "3\n00:00:04,000 --> 00:00:05,000\nthird\n",
    );

    #[test]
    fn test_parse_timestamp() {
        let ts: Timestamp = "01:02:03,456".parse().unwrap();
        assert_eq!(ts.as_millis(), 3_723_456);
        assert_eq!(ts.to_string(), "01:02:03,456");
        assert_eq!(ts.as_duration(), Duration::from_millis(3_723_456));
    }

    #[test]
    fn test_parse_timestamp_rejects_bad_input() {
        assert!("00:00:01.000".parse::<Timestamp>().is_err());
        assert!("00:01,000".parse::<Timestamp>().is_err());
        assert!("00:00:01,00".parse::<Timestamp>().is_err());
        assert!("aa:00:01,000".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_blocks_keep_source_order() {
        let blocks = parse_blocks(THREE_BLOCKS);
        let indexes: Vec<u64> = blocks.iter().map(|b| b.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert_eq!(blocks[1].start.as_millis(), 2_000);
        assert_eq!(blocks[1].end.as_millis(), 3_500);
        assert_eq!(extract_text(THREE_BLOCKS), "first second third");
    }

    #[test]
    fn test_markup_is_stripped_and_whitespace_collapsed() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nHello <b>world</b>\nfoo   bar\n";
        assert_eq!(extract_text(content), "Hello world foo bar");
    }

    #[test]
    fn test_clean_caption_text() {
        assert_eq!(clean_caption_text("  <i>a</i>\t\n b  "), "a b");
        assert_eq!(clean_caption_text("<font color=\"#fff\"></font>"), "");
    }

    #[test]
    fn test_no_blocks_yields_empty_string() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("just some prose\nwithout timing\n"), "");
        assert_eq!(extract_text("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhi\n"), "");
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let content = "1\nnot a timing line\nlost\n\n2\n00:00:02,000 --> 00:00:03,000\nkept\n";
        let blocks = parse_blocks(content);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].index, 2);
        assert_eq!(blocks[0].text, "kept");
    }

    #[test]
    fn test_dropped_blocks_are_counted() {
        let content = concat!(
            "1\nnot a timing line\nlost\n\n",
            "2\n00:00:02,000 --> 00:00:03,000\nkept\n\n",
            "3\n",
        );
        let scan = scan_blocks(content);
        assert_eq!(scan.malformed, 2);
        assert_eq!(scan.blocks.len(), 1);
        assert_eq!(scan.blocks[0].text, "kept");

        assert_eq!(scan_blocks(THREE_BLOCKS).malformed, 0);
    }

    #[test]
    fn test_read_caption_text_keeps_good_blocks_after_drops() {
        let fs = MemoryFileSystem::new().with_file(
            "videos/a.srt",
            "1\nnot a timing line\n\n2\n00:00:02,000 --> 00:00:03,000\nkept\n",
        );
        let text = read_caption_text(&fs, Path::new("videos/a.srt")).unwrap();
        assert_eq!(text, "kept");
    }

    #[test]
    fn test_crlf_and_bom() {
        let content = concat!(
            "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nline one\r\nline two\r\n\r\n",
            "2\r\n00:00:03,000 --> 00:00:04,000\r\nnext\r\n",
        );
        assert_eq!(extract_text(content), "line one line two next");
    }

    #[test]
    fn test_blank_line_inside_text_without_index() {
        let content = concat!(
            "1\n00:00:01,000 --> 00:00:02,000\nbefore\n\n",
            "after\n\n",
            "2\n00:00:03,000 --> 00:00:04,000\nend\n",
        );
        let blocks = parse_blocks(content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "before\n\nafter");
        assert_eq!(extract_text(content), "before after end");
    }

    #[test]
    fn test_numeric_caption_line_is_text() {
        let content = "1\n00:00:01,000 --> 00:00:02,000\nthe year\n2024\n";
        assert_eq!(extract_text(content), "the year 2024");
    }

    #[test]
    fn test_timing_with_position_hint() {
        let content = "1\n00:00:01,000-->00:00:02,000 X1:100 X2:200\ntext\n";
        assert_eq!(extract_text(content), "text");
    }

    #[test]
    fn test_empty_blocks_do_not_add_spaces() {
        let content = concat!(
            "1\n00:00:01,000 --> 00:00:02,000\n<i></i>\n\n",
            "2\n00:00:02,000 --> 00:00:03,000\nonly\n",
        );
        assert_eq!(extract_text(content), "only");
    }

    #[test]
    fn test_read_caption_text_missing_file() {
        let fs = MemoryFileSystem::new();
        let err = read_caption_text(&fs, Path::new("videos/absent.srt")).unwrap_err();
        assert!(matches!(err, HarvestError::MissingInput(_)));
    }

    #[test]
    fn test_read_caption_text() {
        let fs = MemoryFileSystem::new().with_file("videos/a.srt", THREE_BLOCKS);
        let text = read_caption_text(&fs, Path::new("videos/a.srt")).unwrap();
        assert_eq!(text, "first second third");
    }
}
