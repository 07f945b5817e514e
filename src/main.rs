use anyhow::Result;
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subharvest::cli::{Cli, Commands, DirArgs};
use subharvest::config::Config;
use subharvest::sources::{DownloadOptions, VideoSource, YtDlpSource};
use subharvest::{
    utils, CaptionBatchProcessor, ConsoleReporter, LocalFileSystem, MetadataAggregator,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "subharvest=debug" } else { "subharvest=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Extract { dirs, metadata } => {
            let (videos_dir, output_dir) = resolve_dirs(&config, &dirs);
            timed("Processing", || {
                let fs = LocalFileSystem::new();
                let reporter = ConsoleReporter::new(cli.quiet);

                CaptionBatchProcessor::from_config(&fs, &reporter, &config.captions)
                    .run(&videos_dir, &output_dir);

                if metadata {
                    MetadataAggregator::from_config(&fs, &reporter, &config.metadata)
                        .run(&videos_dir, &output_dir);
                }
            });
        }
        Commands::Metadata { dirs } => {
            let (videos_dir, output_dir) = resolve_dirs(&config, &dirs);
            timed("Processing", || {
                let fs = LocalFileSystem::new();
                let reporter = ConsoleReporter::new(cli.quiet);

                MetadataAggregator::from_config(&fs, &reporter, &config.metadata)
                    .run(&videos_dir, &output_dir);
            });
        }
        Commands::Search { handle, max } => {
            warn_missing_dependencies(&config).await;

            let source = YtDlpSource::new(config.downloader.clone());
            let max = max.unwrap_or(config.downloader.max_results).max(1);
            let videos = source.search(&handle, max).await?;

            if videos.is_empty() {
                println!("No videos found for '{}' on {}", handle, source.platform_name());
            }
            for (i, video) in videos.iter().enumerate() {
                println!("[{}/{}] {}  {}", i + 1, videos.len(), video.id, video.title);
            }
        }
        Commands::Download {
            video_id,
            videos_dir,
            no_subtitles,
        } => {
            warn_missing_dependencies(&config).await;

            let source = YtDlpSource::new(config.downloader.clone());
            let options = DownloadOptions {
                output_dir: videos_dir.unwrap_or_else(|| config.paths.videos_dir.clone()),
                include_subtitles: !no_subtitles,
            };

            let progress = spinner(cli.quiet, format!("Downloading {} with yt-dlp...", video_id));
            let result = source.download(&video_id, &options).await;
            progress.finish_and_clear();
            result?;

            println!("Downloaded {} to: {}", video_id, options.output_dir.display());
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::user_config_path()?;
                Config::default().save_to(&path)?;
                println!("Default configuration written to: {}", path.display());
            } else if show {
                config.display();
            } else {
                config.display();
                println!();
                println!("Edit the config file to change these values:");
                println!("  {}", Config::user_config_path()?.display());
            }
        }
    }

    Ok(())
}

/// CLI flags win over the configuration file
fn resolve_dirs(config: &Config, dirs: &DirArgs) -> (PathBuf, PathBuf) {
    (
        dirs.videos_dir
            .clone()
            .unwrap_or_else(|| config.paths.videos_dir.clone()),
        dirs.output_dir
            .clone()
            .unwrap_or_else(|| config.paths.output_dir.clone()),
    )
}

/// Run `f` between start and end banners with the elapsed time
fn timed(label: &str, f: impl FnOnce()) {
    let start = Local::now();
    println!("{} started at: {}", label, utils::format_timestamp(&start));

    f();

    let end = Local::now();
    let elapsed = (end - start).num_milliseconds() as f64 / 1000.0;
    println!("{} finished at: {}", label, utils::format_timestamp(&end));
    println!("Total time: {}", utils::format_duration(elapsed));
}

fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

async fn warn_missing_dependencies(config: &Config) {
    let missing = utils::check_dependencies(&config.downloader.yt_dlp_path).await;
    if !missing.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}
