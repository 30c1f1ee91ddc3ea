//! Command handlers
//!
//! Each video command loads the annotation file, opens one video through a
//! session, applies its edits and saves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use vidanno_core::annotations::{AnnotationFile, AnnotationStore};
use vidanno_core::clips::{Clip, ClipLabel};
use vidanno_core::flow::{read_flow_file, FlowCache};
use vidanno_core::session::{OpenOutcome, Session, VideoSource};
use vidanno_core::settings::{AppConfig, SettingsManager};
use vidanno_core::{CoreError, CoreResult, Direction, FrameIndex, Ratio};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0} already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("No clip contains frame {0}")]
    NoClipAt(FrameIndex),
}

/// Settings and annotation file shared by all commands
pub struct Context {
    config: AppConfig,
    annotations: PathBuf,
}

impl Context {
    pub fn new(config_path: Option<PathBuf>, annotations: PathBuf) -> anyhow::Result<Self> {
        let manager = match config_path {
            Some(path) => SettingsManager::new(path),
            None => SettingsManager::with_default_path()?,
        };
        Ok(Self {
            config: manager.load(),
            annotations,
        })
    }
}

// =============================================================================
// Frame Counts
// =============================================================================

/// Resolves frame counts from, in order: the `--frames` flag, the clips of a
/// stored record with the same path, the length of the flow cache.
struct CliVideoSource {
    frames: Option<FrameIndex>,
    hints: HashMap<PathBuf, FrameIndex>,
}

impl CliVideoSource {
    fn new(frames: Option<FrameIndex>, existing: Option<&AnnotationFile>) -> Self {
        let hints = existing
            .map(|file| {
                file.records()
                    .filter_map(|(_, record)| {
                        record
                            .frame_count_hint()
                            .map(|hint| (PathBuf::from(&record.filepath), hint))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { frames, hints }
    }
}

impl VideoSource for CliVideoSource {
    fn frame_count(&self, video: &Path) -> CoreResult<FrameIndex> {
        if let Some(frames) = self.frames {
            return Ok(frames);
        }
        if let Some(&hint) = self.hints.get(video) {
            return Ok(hint);
        }
        if FlowCache::exists(video) {
            let values = read_flow_file(&FlowCache::cache_path(video))?;
            return Ok(values.len() as FrameIndex + 1);
        }
        Err(CoreError::ValidationError(format!(
            "Cannot determine the frame count of {}: pass --frames or create a flow cache",
            video.display()
        )))
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

fn open_session(ctx: &Context, video: &Path, frames: Option<FrameIndex>) -> anyhow::Result<Session> {
    let store = AnnotationStore::new(&ctx.annotations);
    let existing = if store.exists() {
        Some(store.load()?)
    } else {
        None
    };

    let source = CliVideoSource::new(frames, existing.as_ref());
    let mut session = Session::new(ctx.config.clone(), Box::new(source), Box::new(FlowCache));
    if existing.is_some() {
        session.load_annotations(store.path())?;
    } else {
        session.new_annotations(store.path())?;
    }

    session.set_playlist(vec![video.to_path_buf()])?;
    match session.open_video_at(0)? {
        OpenOutcome::Restored => info!("Restored annotations for {}", video.display()),
        OpenOutcome::Created => info!("Started annotations for {}", video.display()),
        OpenOutcome::Mismatched { refiled } => warn!(
            "Stored annotations for {} did not match the file content (stale record moved to {:?})",
            video.display(),
            refiled
        ),
    }
    Ok(session)
}

fn select_frames(session: &mut Session, frames: &[FrameIndex]) -> anyhow::Result<()> {
    for &frame in frames {
        let span = session
            .partition()?
            .clip_at(frame)
            .map(Clip::span)
            .ok_or(CliError::NoClipAt(frame))?;
        session.select(span)?;
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_break_points(session: &Session) -> anyhow::Result<()> {
    let break_points: Vec<FrameIndex> = session.partition()?.break_points().iter().copied().collect();
    print_json(&json!({ "breakPoints": break_points }))
}

/// Default output of `migrate`: `<stem>.new.json` next to the input
pub fn migrated_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "annotations".to_string());
    input.with_file_name(format!("{stem}.new.json"))
}

// =============================================================================
// Commands
// =============================================================================

pub fn init(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let store = AnnotationStore::new(&ctx.annotations);
    if store.exists() && !force {
        return Err(CliError::AlreadyExists(ctx.annotations.clone()).into());
    }
    store.create_new(ctx.config.application.clone())?;
    println!("{}", store.path().display());
    Ok(())
}

pub async fn checksum(ctx: &Context, video: PathBuf) -> anyhow::Result<()> {
    let digest = ctx.config.checksum_store().checksum_async(video.clone()).await?;
    println!("{}  {}", digest, video.display());
    Ok(())
}

pub fn show(
    ctx: &Context,
    video: &Path,
    frames: Option<FrameIndex>,
    fps: Option<Ratio>,
) -> anyhow::Result<()> {
    let session = open_session(ctx, video, frames)?;
    let open = session.video().ok_or(CoreError::NoVideoOpen)?;
    let partition = open.partition();
    let break_points: Vec<FrameIndex> = partition.break_points().iter().copied().collect();

    print_json(&json!({
        "video": open.path(),
        "checksum": open.checksum(),
        "totalFrames": partition.total_frames(),
        "breakPoints": break_points,
        "clips": partition.summaries(fps),
    }))
}

pub fn toggle_break_points(
    ctx: &Context,
    video: &Path,
    frames: Option<FrameIndex>,
    at: &[FrameIndex],
) -> anyhow::Result<()> {
    let mut session = open_session(ctx, video, frames)?;
    for &frame in at {
        if !session.toggle_break_point(frame)? {
            warn!("Ignoring break point {} outside the video", frame);
        }
    }
    session.save()?;
    print_break_points(&session)
}

pub fn remove_clips(
    ctx: &Context,
    video: &Path,
    frames: Option<FrameIndex>,
    at: &[FrameIndex],
) -> anyhow::Result<()> {
    let mut session = open_session(ctx, video, frames)?;
    select_frames(&mut session, at)?;
    if !session.remove_selected_clips()? {
        warn!("No break points bound the selected clips");
    }
    session.save()?;
    print_break_points(&session)
}

pub fn label(
    ctx: &Context,
    video: &Path,
    frames: Option<FrameIndex>,
    label: ClipLabel,
    at: &[FrameIndex],
    reasons: Vec<String>,
) -> anyhow::Result<()> {
    let mut session = open_session(ctx, video, frames)?;
    select_frames(&mut session, at)?;
    let reasons: IndexSet<String> = reasons.into_iter().collect();
    let labeled = session.label_selected(label, &reasons)?;
    session.save()?;
    print_json(&json!({ "labeled": labeled, "label": label.as_str() }))
}

pub fn toggle_keyframes(
    ctx: &Context,
    video: &Path,
    frames: Option<FrameIndex>,
    at: &[FrameIndex],
) -> anyhow::Result<()> {
    let mut session = open_session(ctx, video, frames)?;
    for &frame in at {
        if !session.toggle_keyframe(frame)? {
            warn!("Ignoring keyframe {}: not inside an Accept clip", frame);
        }
    }
    session.save()?;

    let keyframes: Vec<FrameIndex> = at
        .first()
        .and_then(|&frame| session.partition().ok()?.clip_at(frame))
        .map(|c| c.keyframes().iter().copied().collect())
        .unwrap_or_default();
    print_json(&json!({ "keyframes": keyframes }))
}

pub fn generate(
    ctx: &Context,
    video: &Path,
    frames: Option<FrameIndex>,
    at: FrameIndex,
) -> anyhow::Result<()> {
    let mut session = open_session(ctx, video, frames)?;
    if !session.generate_keyframes_at(at)? {
        warn!("No Accept clip at frame {}", at);
    }
    session.save()?;

    let keyframes: Vec<FrameIndex> = session
        .partition()?
        .clip_at(at)
        .map(|c| c.keyframes().iter().copied().collect())
        .unwrap_or_default();
    print_json(&json!({
        "keyframes": keyframes,
        "threshold": ctx.config.keyframe_generator().threshold(),
    }))
}

pub fn nav(
    ctx: &Context,
    video: &Path,
    frames: Option<FrameIndex>,
    at: FrameIndex,
    keyframes: bool,
    direction: Direction,
) -> anyhow::Result<()> {
    let session = open_session(ctx, video, frames)?;
    let partition = session.partition()?;
    let nearest = if keyframes {
        partition.nearest_keyframe(at, direction)
    } else {
        partition.nearest_break_point(at, direction)
    };
    print_json(&json!({ "frame": nearest }))
}

pub fn loop_range(
    ctx: &Context,
    video: &Path,
    frames: Option<FrameIndex>,
    at: &[FrameIndex],
) -> anyhow::Result<()> {
    let mut session = open_session(ctx, video, frames)?;
    select_frames(&mut session, at)?;
    let range = session.partition()?.loop_range();
    print_json(&json!({
        "start": range.map(|r| r.start),
        "end": range.map(|r| r.end),
    }))
}

/// Writes the migrated file stamped with the running application identity
pub fn migrate(ctx: &Context, input: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let output = output.unwrap_or_else(|| migrated_output_path(input));
    let mut file = AnnotationStore::new(input).load()?;
    file.metainfo = ctx.config.application.clone();
    AnnotationStore::new(&output).save(&file)?;
    info!(
        "Converted {} records from {} to {}",
        file.len(),
        input.display(),
        output.display()
    );
    println!("{}", output.display());
    Ok(())
}

pub fn flow(video: &Path) -> anyhow::Result<()> {
    let path = FlowCache::cache_path(video);
    let values = read_flow_file(&path)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    };

    print_json(&json!({
        "cache": path,
        "values": values.len(),
        "frames": values.len() + 1,
        "min": if values.is_empty() { None } else { Some(min) },
        "max": if values.is_empty() { None } else { Some(max) },
        "mean": mean,
    }))
}
