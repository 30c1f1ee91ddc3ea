//! # vidanno CLI
//!
//! Headless annotation of video files: split a video into clips at break
//! points, label clips, and mark keyframes, with results stored in a
//! checksum-keyed annotation file.
//!
//! ```bash
//! vidanno init -a annotations.json
//! vidanno break clip01.mp4 120 480 --frames 900
//! vidanno label clip01.mp4 accept --at 200 --reason 1 --reason 3.2
//! vidanno generate clip01.mp4 200
//! vidanno show clip01.mp4 --fps 30000/1001
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use vidanno_core::clips::ClipLabel;
use vidanno_core::{Direction, FrameIndex, Ratio};

mod commands;

/// vidanno - clip and keyframe annotation for videos
#[derive(Parser)]
#[command(name = "vidanno")]
#[command(version)]
#[command(about = "Split videos into labeled clips and mark keyframes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Annotation file
    #[arg(short, long, global = true, default_value = "annotations.json")]
    annotations: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Frame count override shared by video commands
#[derive(clap::Args, Debug, Clone, Copy, Default)]
struct FrameArgs {
    /// Total frame count of the video
    #[arg(long)]
    frames: Option<FrameIndex>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty annotation file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the content checksum of a video
    Checksum {
        video: PathBuf,
    },

    /// Print the clips of a video
    Show {
        video: PathBuf,
        #[command(flatten)]
        frames: FrameArgs,
        /// Frame rate used for clip durations
        #[arg(long)]
        fps: Option<Ratio>,
    },

    /// Toggle break points
    Break {
        video: PathBuf,
        #[arg(required = true)]
        at: Vec<FrameIndex>,
        #[command(flatten)]
        frames: FrameArgs,
    },

    /// Remove the break points bounding the clips at the given frames
    Remove {
        video: PathBuf,
        #[arg(required = true)]
        at: Vec<FrameIndex>,
        #[command(flatten)]
        frames: FrameArgs,
    },

    /// Label the clips at the given frames
    Label {
        video: PathBuf,
        /// accept, reject or none
        label: ClipLabel,
        /// Frames inside the clips to label
        #[arg(long = "at", required = true)]
        at: Vec<FrameIndex>,
        /// Reason from the catalog of the label
        #[arg(short, long = "reason")]
        reasons: Vec<String>,
        #[command(flatten)]
        frames: FrameArgs,
    },

    /// Toggle keyframes inside Accept clips
    Keyframe {
        video: PathBuf,
        #[arg(required = true)]
        at: Vec<FrameIndex>,
        #[command(flatten)]
        frames: FrameArgs,
    },

    /// Generate keyframes for the Accept clip at a frame from the flow cache
    Generate {
        video: PathBuf,
        at: FrameIndex,
        #[command(flatten)]
        frames: FrameArgs,
    },

    /// Print the nearest break point or keyframe from a frame
    Nav {
        video: PathBuf,
        at: FrameIndex,
        #[arg(long, value_enum, default_value_t = NavTarget::Break)]
        target: NavTarget,
        #[arg(long, value_enum, default_value_t = NavDirection::Next)]
        direction: NavDirection,
        #[command(flatten)]
        frames: FrameArgs,
    },

    /// Print the playback range of the first run of clips at the given frames
    LoopRange {
        video: PathBuf,
        #[arg(required = true)]
        at: Vec<FrameIndex>,
        #[command(flatten)]
        frames: FrameArgs,
    },

    /// Convert an annotation file to the checksum-keyed layout
    Migrate {
        input: PathBuf,
        /// Output path (defaults to `<input stem>.new.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print statistics of the flow cache paired with a video
    Flow {
        video: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum NavTarget {
    Break,
    Keyframe,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum NavDirection {
    Prev,
    Next,
}

impl From<NavDirection> for Direction {
    fn from(direction: NavDirection) -> Self {
        match direction {
            NavDirection::Prev => Direction::Prev,
            NavDirection::Next => Direction::Next,
        }
    }
}

/// `-v` forces debug; otherwise `RUST_LOG` applies, defaulting to info
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("Ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e);
            EnvFilter::new("info")
        }),
        None => EnvFilter::new("info"),
    }
}

fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = log_filter(verbose, rust_log.as_deref());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // Avoid panics if already initialized.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = commands::Context::new(cli.config, cli.annotations)?;

    match cli.command {
        Commands::Init { force } => commands::init(&ctx, force),
        Commands::Checksum { video } => commands::checksum(&ctx, video).await,
        Commands::Show { video, frames, fps } => commands::show(&ctx, &video, frames.frames, fps),
        Commands::Break { video, at, frames } => {
            commands::toggle_break_points(&ctx, &video, frames.frames, &at)
        }
        Commands::Remove { video, at, frames } => {
            commands::remove_clips(&ctx, &video, frames.frames, &at)
        }
        Commands::Label {
            video,
            label,
            at,
            reasons,
            frames,
        } => commands::label(&ctx, &video, frames.frames, label, &at, reasons),
        Commands::Keyframe { video, at, frames } => {
            commands::toggle_keyframes(&ctx, &video, frames.frames, &at)
        }
        Commands::Generate { video, at, frames } => {
            commands::generate(&ctx, &video, frames.frames, at)
        }
        Commands::Nav {
            video,
            at,
            target,
            direction,
            frames,
        } => commands::nav(
            &ctx,
            &video,
            frames.frames,
            at,
            target == NavTarget::Keyframe,
            direction.into(),
        ),
        Commands::LoopRange { video, at, frames } => {
            commands::loop_range(&ctx, &video, frames.frames, &at)
        }
        Commands::Migrate { input, output } => commands::migrate(&ctx, &input, output),
        Commands::Flow { video } => commands::flow(&video),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_log_filter_levels() {
        assert_eq!(log_filter(false, None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            log_filter(false, Some("warn")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
        assert_eq!(
            log_filter(true, Some("warn")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(log_filter(false, Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
    }
}
