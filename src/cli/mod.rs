use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "subharvest",
    about = "Subharvest - Turn downloaded video subtitles and metadata into plain-text corpora",
    version,
    long_about = "A CLI tool that extracts clean text from SRT caption files, aggregates per-video .info.json descriptors into one metadata file, and drives yt-dlp to fetch those files from the video platform."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Input and output directories, overriding the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct DirArgs {
    /// Directory holding videos, caption files and descriptors
    #[arg(short = 'i', long, value_name = "DIR", env = "SUBHARVEST_VIDEOS_DIR")]
    pub videos_dir: Option<PathBuf>,

    /// Directory receiving extracted text files
    #[arg(short, long, value_name = "DIR", env = "SUBHARVEST_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract plain text from every caption file under the videos directory
    Extract {
        #[command(flatten)]
        dirs: DirArgs,

        /// Also aggregate video descriptors into a metadata file
        #[arg(short, long)]
        metadata: bool,
    },

    /// Aggregate video descriptors into a single metadata file
    Metadata {
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// List an uploader's videos
    Search {
        /// Uploader name or handle to resolve
        #[arg(value_name = "HANDLE")]
        handle: String,

        /// Maximum number of videos to list (defaults to the configured value)
        #[arg(short, long, value_name = "COUNT")]
        max: Option<usize>,
    },

    /// Download a single video with its descriptor and subtitles
    Download {
        /// Platform video identifier (e.g. BV1xx411c7mD)
        #[arg(value_name = "VIDEO_ID")]
        video_id: String,

        /// Directory receiving the downloaded files
        #[arg(short = 'i', long, value_name = "DIR", env = "SUBHARVEST_VIDEOS_DIR")]
        videos_dir: Option<PathBuf>,

        /// Skip subtitle download
        #[arg(long)]
        no_subtitles: bool,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long, conflicts_with = "init")]
        show: bool,

        /// Write the default configuration to the per-user config file
        #[arg(long)]
        init: bool,
    },
}
