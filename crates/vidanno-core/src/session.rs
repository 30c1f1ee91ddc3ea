//! Annotation Session
//!
//! Owns the open annotation file, the playlist and the partition of the video
//! being annotated. Switching videos always runs in the same order: the
//! outgoing partition is written into the annotation file and saved, then the
//! next video is opened, then its partition is restored or created.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::{debug, error, info, warn};

use crate::annotations::{AnnotationFile, AnnotationRecord, AnnotationStore, Lookup};
use crate::checksum::ChecksumStore;
use crate::clips::{ClipLabel, ClipPartition, ClipSummary, KeyframeGenerator, KeyframeReset};
use crate::flow::FlowSignal;
use crate::playlist::discover_videos;
use crate::settings::AppConfig;
use crate::{Checksum, CoreError, CoreResult, FrameIndex, FrameSpan, Ratio};

/// Extension given to annotation files created or saved by path
pub const ANNOTATION_EXTENSION: &str = "json";

/// Source of video metadata
pub trait VideoSource {
    /// Number of frames in `video`
    fn frame_count(&self, video: &Path) -> CoreResult<FrameIndex>;
}

// =============================================================================
// Open Video
// =============================================================================

/// How the partition of a newly opened video was obtained
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Restored from the stored record
    Restored,
    /// No record existed; a fresh one was created
    Created,
    /// The stored record carried another checksum; a fresh one replaced it.
    /// `refiled` is the key the stale record was moved to, if any.
    Mismatched { refiled: Option<Checksum> },
}

/// The video currently being annotated
#[derive(Debug)]
pub struct OpenVideo {
    path: PathBuf,
    checksum: Checksum,
    partition: ClipPartition,
    flow: Option<Vec<f64>>,
}

impl OpenVideo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn partition(&self) -> &ClipPartition {
        &self.partition
    }

    fn record(&self) -> AnnotationRecord {
        self.partition
            .to_record(self.path.to_string_lossy(), self.checksum.clone())
    }
}

// =============================================================================
// Session
// =============================================================================

/// One annotation session
pub struct Session {
    config: AppConfig,
    checksums: ChecksumStore,
    generator: KeyframeGenerator,
    video_source: Box<dyn VideoSource>,
    flow_signal: Box<dyn FlowSignal>,
    store: Option<AnnotationStore>,
    annotations: AnnotationFile,
    playlist: Vec<PathBuf>,
    current_index: Option<usize>,
    video: Option<OpenVideo>,
}

impl Session {
    pub fn new(
        config: AppConfig,
        video_source: Box<dyn VideoSource>,
        flow_signal: Box<dyn FlowSignal>,
    ) -> Self {
        Self {
            checksums: config.checksum_store(),
            generator: config.keyframe_generator(),
            annotations: AnnotationFile::new(config.application.clone()),
            config,
            video_source,
            flow_signal,
            store: None,
            playlist: Vec::new(),
            current_index: None,
            video: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn annotations(&self) -> &AnnotationFile {
        &self.annotations
    }

    /// Path of the active annotation file
    pub fn annotation_path(&self) -> Option<&Path> {
        self.store.as_ref().map(AnnotationStore::path)
    }

    pub fn playlist(&self) -> &[PathBuf] {
        &self.playlist
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn video(&self) -> Option<&OpenVideo> {
        self.video.as_ref()
    }

    /// Partition of the open video
    pub fn partition(&self) -> CoreResult<&ClipPartition> {
        self.video
            .as_ref()
            .map(|v| &v.partition)
            .ok_or(CoreError::NoVideoOpen)
    }

    fn partition_mut(&mut self) -> CoreResult<&mut ClipPartition> {
        self.video
            .as_mut()
            .map(|v| &mut v.partition)
            .ok_or(CoreError::NoVideoOpen)
    }

    // =========================================================================
    // Annotation File
    // =========================================================================

    /// Starts a new, empty annotation file at `path` and writes it immediately.
    ///
    /// The open video, if any, restarts from a fresh partition.
    pub fn new_annotations(&mut self, path: &Path) -> CoreResult<()> {
        let store = AnnotationStore::new(with_annotation_extension(path));
        self.annotations = store.create_new(self.config.application.clone())?;
        info!(
            "[session] Created new annotations at {}",
            store.path().display()
        );
        self.store = Some(store);

        if let Some(video) = self.video.as_mut() {
            video.partition = ClipPartition::new(video.partition.total_frames())?;
            let record = video.record();
            self.annotations.upsert(video.checksum.clone(), record);
        }
        Ok(())
    }

    /// Loads the annotation file at `path` and makes it active.
    ///
    /// On failure the in-memory annotations are reset to empty, no annotation
    /// file stays active and the error is returned. Edits continue in memory
    /// until a file is created or loaded.
    pub fn load_annotations(&mut self, path: &Path) -> CoreResult<()> {
        let store = AnnotationStore::new(path);
        match store.load() {
            Ok(mut file) => {
                file.metainfo = self.config.application.clone();
                self.annotations = file;
                self.store = Some(store);
            }
            Err(e) => {
                error!(
                    "[session] Error loading annotations from {}: {}",
                    path.display(),
                    e
                );
                self.annotations = AnnotationFile::new(self.config.application.clone());
                self.store = None;
                return Err(e);
            }
        }

        if let Some(video) = self.video.take() {
            let total_frames = video.partition.total_frames();
            self.attach(video.path, video.checksum, total_frames)?;
        }
        Ok(())
    }

    /// Writes the open partition into the annotation file and saves it
    pub fn save(&mut self) -> CoreResult<()> {
        self.commit_current();
        let store = self.store.as_ref().ok_or(CoreError::NoAnnotationFile)?;
        store.save(&self.annotations)
    }

    /// Saves a copy to `path`. The active annotation file does not change.
    pub fn save_as(&mut self, path: &Path) -> CoreResult<PathBuf> {
        self.commit_current();
        let store = AnnotationStore::new(with_annotation_extension(path));
        store.save(&self.annotations)?;
        Ok(store.path().to_path_buf())
    }

    fn commit_current(&mut self) {
        if let Some(video) = self.video.as_ref() {
            self.annotations.upsert(video.checksum.clone(), video.record());
        }
    }

    /// Commits the open video and saves when an annotation file is active
    fn persist_current(&mut self) -> CoreResult<()> {
        if self.video.is_none() {
            return Ok(());
        }
        self.commit_current();
        match self.store.as_ref() {
            Some(store) => store.save(&self.annotations),
            None => {
                debug!("[session] No annotation file selected, keeping edits in memory");
                Ok(())
            }
        }
    }

    // =========================================================================
    // Playlist
    // =========================================================================

    /// Replaces the playlist after saving the open video. No video is open
    /// afterwards.
    pub fn set_playlist(&mut self, paths: Vec<PathBuf>) -> CoreResult<()> {
        self.persist_current()?;
        self.video = None;
        self.current_index = None;
        self.playlist = paths;
        info!("[session] Playlist set, len={}", self.playlist.len());
        Ok(())
    }

    /// Scans `folder` for videos, makes them the playlist and opens the first
    pub fn open_folder(&mut self, folder: &Path) -> CoreResult<usize> {
        let videos = discover_videos(folder);
        if videos.is_empty() {
            return Err(CoreError::ValidationError(format!(
                "No video files found in {}",
                folder.display()
            )));
        }
        let count = videos.len();
        self.set_playlist(videos)?;
        self.open_video_at(0)?;
        Ok(count)
    }

    /// Saves the open video, then opens the playlist entry at `index`
    pub fn open_video_at(&mut self, index: usize) -> CoreResult<OpenOutcome> {
        let path = self
            .playlist
            .get(index)
            .cloned()
            .ok_or(CoreError::VideoIndexOutOfRange {
                index,
                len: self.playlist.len(),
            })?;

        self.persist_current()?;
        self.video = None;
        let total_frames = self.video_source.frame_count(&path)?;
        let outcome = self.open_checked(path, total_frames)?;
        self.current_index = Some(index);
        info!(
            "[session] Playing video {}/{}",
            index + 1,
            self.playlist.len()
        );
        Ok(outcome)
    }

    /// Opens the next playlist entry. Returns `None` at the end.
    pub fn next_video(&mut self) -> CoreResult<Option<OpenOutcome>> {
        let next = self.current_index.map_or(0, |i| i + 1);
        if next >= self.playlist.len() {
            return Ok(None);
        }
        self.open_video_at(next).map(Some)
    }

    /// Opens the previous playlist entry. Returns `None` at the start.
    pub fn prev_video(&mut self) -> CoreResult<Option<OpenOutcome>> {
        match self.current_index {
            Some(i) if i > 0 => self.open_video_at(i - 1).map(Some),
            _ => Ok(None),
        }
    }

    /// Saves the open video, then opens `path` outside the playlist
    pub fn open_video(&mut self, path: &Path, total_frames: FrameIndex) -> CoreResult<OpenOutcome> {
        self.persist_current()?;
        self.video = None;
        self.current_index = None;
        self.open_checked(path.to_path_buf(), total_frames)
    }

    fn open_checked(&mut self, path: PathBuf, total_frames: FrameIndex) -> CoreResult<OpenOutcome> {
        let checksum = self.checksums.checksum(&path)?;
        info!(
            "[session] Opened {}, {:?}:{}",
            path.display(),
            self.checksums.algorithm(),
            checksum
        );
        self.attach(path, checksum, total_frames)
    }

    /// Looks up `checksum` and makes the restored or fresh partition current
    fn attach(
        &mut self,
        path: PathBuf,
        checksum: Checksum,
        total_frames: FrameIndex,
    ) -> CoreResult<OpenOutcome> {
        let validate = self.config.application.enable_hashsum_validation;
        let (partition, outcome) = match self.annotations.lookup(&checksum, validate) {
            Lookup::Found(record) => {
                debug!("[session] Loading saved state for {}", path.display());
                (
                    ClipPartition::from_record(total_frames, record)?,
                    OpenOutcome::Restored,
                )
            }
            Lookup::Mismatch(record) => {
                warn!(
                    "[session] Video file has changed! Stored checksum: {}, current: {}",
                    record.checksum, checksum
                );
                let partition = ClipPartition::new(total_frames)?;
                let refiled = self.annotations.refile_mismatched(&checksum);
                (partition, OpenOutcome::Mismatched { refiled })
            }
            Lookup::Missing => {
                debug!("[session] Creating new state for {}", path.display());
                (ClipPartition::new(total_frames)?, OpenOutcome::Created)
            }
        };

        let video = OpenVideo {
            path,
            checksum,
            partition,
            flow: None,
        };
        if outcome != OpenOutcome::Restored {
            self.annotations.upsert(video.checksum.clone(), video.record());
        }
        self.video = Some(video);
        Ok(outcome)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub fn toggle_break_point(&mut self, frame: FrameIndex) -> CoreResult<bool> {
        Ok(self.partition_mut()?.toggle_break_point(frame))
    }

    pub fn remove_selected_clips(&mut self) -> CoreResult<bool> {
        Ok(self.partition_mut()?.remove_selected_clips())
    }

    pub fn toggle_selection(&mut self, frame: FrameIndex) -> CoreResult<bool> {
        Ok(self.partition_mut()?.toggle_selection(frame))
    }

    pub fn select(&mut self, span: FrameSpan) -> CoreResult<bool> {
        Ok(self.partition_mut()?.select(span))
    }

    pub fn clear_selection(&mut self) -> CoreResult<bool> {
        Ok(self.partition_mut()?.clear_selection())
    }

    /// Labels clips by bounds after validating the reasons
    pub fn set_label(
        &mut self,
        spans: &[FrameSpan],
        label: ClipLabel,
        reasons: &IndexSet<String>,
    ) -> CoreResult<usize> {
        let reasons = self.config.check_reasons(label, reasons)?;
        Ok(self.partition_mut()?.set_label(spans, label, &reasons))
    }

    /// Labels the selected clips after validating the reasons
    pub fn label_selected(
        &mut self,
        label: ClipLabel,
        reasons: &IndexSet<String>,
    ) -> CoreResult<usize> {
        let reasons = self.config.check_reasons(label, reasons)?;
        Ok(self.partition_mut()?.label_selected(label, &reasons))
    }

    pub fn toggle_keyframe(&mut self, frame: FrameIndex) -> CoreResult<bool> {
        Ok(self.partition_mut()?.toggle_keyframe(frame))
    }

    /// Open video with its flow signal loaded
    fn with_flow(&mut self) -> CoreResult<&mut OpenVideo> {
        let video = self.video.as_mut().ok_or(CoreError::NoVideoOpen)?;
        if video.flow.is_none() {
            let values = self.flow_signal.compute(&video.path)?;
            debug!(
                "[session] Loaded flow signal for {}, length={}",
                video.path.display(),
                values.len()
            );
            video.flow = Some(values);
        }
        Ok(video)
    }

    /// Regenerates keyframes of the Accept clip containing `frame`
    pub fn generate_keyframes_at(&mut self, frame: FrameIndex) -> CoreResult<bool> {
        let generator = self.generator;
        let video = self.with_flow()?;
        let flow = video.flow.as_deref().unwrap_or_default();
        video.partition.generate_keyframes_at(frame, flow, &generator)
    }

    /// Clears or generates keyframes of the first selected Accept clip
    pub fn reset_first_selected_keyframes(&mut self) -> CoreResult<Option<KeyframeReset>> {
        let generator = self.generator;
        let video = self.with_flow()?;
        let flow = video.flow.as_deref().unwrap_or_default();
        video
            .partition
            .reset_first_selected_keyframes(flow, &generator)
    }

    pub fn summaries(&self, fps: Option<Ratio>) -> CoreResult<Vec<ClipSummary>> {
        Ok(self.partition()?.summaries(fps))
    }
}

fn with_annotation_extension(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ANNOTATION_EXTENSION));
    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(ANNOTATION_EXTENSION);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct FixedFrames(HashMap<PathBuf, FrameIndex>);

    impl VideoSource for FixedFrames {
        fn frame_count(&self, video: &Path) -> CoreResult<FrameIndex> {
            self.0
                .get(video)
                .copied()
                .ok_or_else(|| CoreError::ValidationError(format!("unknown {}", video.display())))
        }
    }

    struct ConstantFlow(f64);

    impl FlowSignal for ConstantFlow {
        fn compute(&self, _video: &Path) -> CoreResult<Vec<f64>> {
            Ok(vec![self.0; 1000])
        }
    }

    struct Fixture {
        dir: TempDir,
        videos: Vec<PathBuf>,
    }

    impl Fixture {
        fn new(contents: &[&[u8]]) -> Self {
            let dir = TempDir::new().unwrap();
            let videos = contents
                .iter()
                .enumerate()
                .map(|(i, bytes)| {
                    let path = dir.path().join(format!("video_{i}.mp4"));
                    std::fs::write(&path, bytes).unwrap();
                    path
                })
                .collect();
            Self { dir, videos }
        }

        fn annotations_path(&self) -> PathBuf {
            self.dir.path().join("annotations.json")
        }

        fn session(&self, config: AppConfig) -> Session {
            let frames = self.videos.iter().map(|p| (p.clone(), 100)).collect();
            Session::new(
                config,
                Box::new(FixedFrames(frames)),
                Box::new(ConstantFlow(0.05)),
            )
        }
    }

    fn reasons(items: &[&str]) -> IndexSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_switch_saves_outgoing_edits_first() {
        let fx = Fixture::new(&[b"first", b"second"]);
        let mut session = fx.session(AppConfig::default());
        session.new_annotations(&fx.annotations_path()).unwrap();
        session.set_playlist(fx.videos.clone()).unwrap();

        assert_eq!(session.next_video().unwrap(), Some(OpenOutcome::Created));
        session.toggle_break_point(40).unwrap();
        assert_eq!(session.next_video().unwrap(), Some(OpenOutcome::Created));
        assert_eq!(session.current_index(), Some(1));

        // The first video's edit is on disk before the second was opened.
        let on_disk = AnnotationStore::new(fx.annotations_path()).load().unwrap();
        let first = ChecksumStore::default().checksum(&fx.videos[0]).unwrap();
        assert_eq!(on_disk.get(&first).unwrap().break_points, vec![40]);

        assert_eq!(session.prev_video().unwrap(), Some(OpenOutcome::Restored));
        assert_eq!(session.partition().unwrap().break_points().len(), 1);
        assert_eq!(session.prev_video().unwrap(), None);
    }

    #[test]
    fn test_state_survives_a_new_session() {
        let fx = Fixture::new(&[b"content"]);
        {
            let mut session = fx.session(AppConfig::default());
            session.new_annotations(&fx.annotations_path()).unwrap();
            session.open_video(&fx.videos[0], 100).unwrap();
            session.toggle_break_point(50).unwrap();
            session
                .set_label(&[FrameSpan::new(0, 50)], ClipLabel::Accept, &reasons(&["4", "1"]))
                .unwrap();
            session.toggle_keyframe(20).unwrap();
            session.save().unwrap();
        }

        let mut session = fx.session(AppConfig::default());
        session.load_annotations(&fx.annotations_path()).unwrap();
        assert_eq!(
            session.open_video(&fx.videos[0], 100).unwrap(),
            OpenOutcome::Restored
        );
        let clip = session.partition().unwrap().clip_at(0).unwrap();
        assert_eq!(clip.label(), ClipLabel::Accept);
        assert_eq!(clip.reasons(), &reasons(&["1", "4"]));
        assert_eq!(clip.keyframes().iter().copied().collect::<Vec<_>>(), vec![20]);
    }

    #[test]
    fn test_renamed_file_keeps_annotations() {
        let fx = Fixture::new(&[b"same bytes"]);
        let mut session = fx.session(AppConfig::default());
        session.new_annotations(&fx.annotations_path()).unwrap();
        session.open_video(&fx.videos[0], 100).unwrap();
        session.toggle_break_point(10).unwrap();

        let moved = fx.dir.path().join("renamed.mp4");
        std::fs::copy(&fx.videos[0], &moved).unwrap();
        session.save().unwrap();

        assert_eq!(session.open_video(&moved, 100).unwrap(), OpenOutcome::Restored);
        session.save().unwrap();
        let checksum = session.video().unwrap().checksum().to_string();
        let record = session.annotations().get(&checksum).unwrap();
        assert_eq!(record.filepath, moved.to_string_lossy());
        assert_eq!(record.break_points, vec![10]);
    }

    #[test]
    fn test_mismatched_record_starts_fresh_and_is_refiled() {
        let fx = Fixture::new(&[b"video"]);
        let checksum = ChecksumStore::default().checksum(&fx.videos[0]).unwrap();

        let mut stale = ClipPartition::new(100).unwrap();
        stale.toggle_break_point(30);
        let mut file = AnnotationFile::default();
        file.upsert(checksum.clone(), stale.to_record("old.mp4", "deadbeef"));
        AnnotationStore::new(fx.annotations_path()).save(&file).unwrap();

        let mut session = fx.session(AppConfig::default());
        session.load_annotations(&fx.annotations_path()).unwrap();
        let outcome = session.open_video(&fx.videos[0], 100).unwrap();

        assert_eq!(
            outcome,
            OpenOutcome::Mismatched {
                refiled: Some("deadbeef".to_string())
            }
        );
        assert!(session.partition().unwrap().break_points().is_empty());
        assert_eq!(session.annotations().get("deadbeef").unwrap().break_points, vec![30]);
        assert_eq!(session.annotations().get(&checksum).unwrap().checksum, checksum);
    }

    #[test]
    fn test_disabled_validation_trusts_record() {
        let fx = Fixture::new(&[b"video"]);
        let checksum = ChecksumStore::default().checksum(&fx.videos[0]).unwrap();
        let mut stale = ClipPartition::new(100).unwrap();
        stale.toggle_break_point(30);
        let mut file = AnnotationFile::default();
        file.upsert(checksum, stale.to_record("old.mp4", "deadbeef"));
        AnnotationStore::new(fx.annotations_path()).save(&file).unwrap();

        let mut config = AppConfig::default();
        config.application.enable_hashsum_validation = false;
        let mut session = fx.session(config);
        session.load_annotations(&fx.annotations_path()).unwrap();

        assert_eq!(
            session.open_video(&fx.videos[0], 100).unwrap(),
            OpenOutcome::Restored
        );
        assert_eq!(session.partition().unwrap().break_points().len(), 1);
    }

    #[test]
    fn test_failed_load_resets_annotations() {
        let fx = Fixture::new(&[b"video"]);
        let mut session = fx.session(AppConfig::default());
        session.new_annotations(&fx.annotations_path()).unwrap();
        session.open_video(&fx.videos[0], 100).unwrap();
        assert_eq!(session.annotations().len(), 1);

        let broken = fx.dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(session.load_annotations(&broken).is_err());
        assert!(session.annotations().is_empty());
        assert_eq!(session.annotation_path(), None);
        assert!(matches!(session.save(), Err(CoreError::NoAnnotationFile)));
    }

    #[test]
    fn test_switch_after_failed_load_keeps_previous_file() {
        let fx = Fixture::new(&[b"first", b"second"]);
        let mut session = fx.session(AppConfig::default());
        session.new_annotations(&fx.annotations_path()).unwrap();
        session.set_playlist(fx.videos.clone()).unwrap();
        session.open_video_at(0).unwrap();
        session.toggle_break_point(40).unwrap();
        session.open_video_at(1).unwrap();
        session.save().unwrap();

        let store = AnnotationStore::new(fx.annotations_path());
        assert_eq!(store.load().unwrap().len(), 2);

        let broken = fx.dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(session.load_annotations(&broken).is_err());
        session.open_video_at(0).unwrap();

        let on_disk = store.load().unwrap();
        let first = ChecksumStore::default().checksum(&fx.videos[0]).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk.get(&first).unwrap().break_points, vec![40]);
    }

    #[test]
    fn test_label_reasons_are_validated() {
        let fx = Fixture::new(&[b"video"]);
        let mut session = fx.session(AppConfig::default());
        session.open_video(&fx.videos[0], 100).unwrap();
        session.toggle_selection(0).unwrap();

        let err = session
            .label_selected(ClipLabel::Reject, &reasons(&["3.1"]))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownReason { .. }));
        assert!(session.partition().unwrap().clip_at(0).unwrap().is_selected());

        assert_eq!(
            session
                .label_selected(ClipLabel::Reject, &reasons(&["1.2"]))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_keyframe_commands_use_flow_signal() {
        let fx = Fixture::new(&[b"video"]);
        let mut session = fx.session(AppConfig::default());
        session.open_video(&fx.videos[0], 100).unwrap();
        session.toggle_break_point(10).unwrap();
        session.toggle_break_point(20).unwrap();
        session
            .set_label(&[FrameSpan::new(10, 20)], ClipLabel::Accept, &reasons(&["1"]))
            .unwrap();

        assert!(session.generate_keyframes_at(12).unwrap());
        let keyframes: Vec<_> = session
            .partition()
            .unwrap()
            .clip_at(12)
            .unwrap()
            .keyframes()
            .iter()
            .copied()
            .collect();
        assert_eq!(keyframes, vec![10, 15]);

        session.select(FrameSpan::new(10, 20)).unwrap();
        assert_eq!(
            session.reset_first_selected_keyframes().unwrap(),
            Some(KeyframeReset::Cleared {
                span: FrameSpan::new(10, 20),
                removed: 2
            })
        );
    }

    #[test]
    fn test_commands_without_video() {
        let fx = Fixture::new(&[]);
        let mut session = fx.session(AppConfig::default());
        assert!(matches!(session.toggle_break_point(5), Err(CoreError::NoVideoOpen)));
        assert!(matches!(session.save(), Err(CoreError::NoAnnotationFile)));
        assert!(matches!(
            session.open_video_at(0),
            Err(CoreError::VideoIndexOutOfRange { index: 0, len: 0 })
        ));
        assert_eq!(session.next_video().unwrap(), None);
    }

    #[test]
    fn test_new_annotations_appends_extension_and_resets_video() {
        let fx = Fixture::new(&[b"video"]);
        let mut session = fx.session(AppConfig::default());
        session.open_video(&fx.videos[0], 100).unwrap();
        session.toggle_break_point(10).unwrap();

        session.new_annotations(&fx.dir.path().join("fresh")).unwrap();
        assert!(fx.dir.path().join("fresh.json").exists());
        assert!(session.partition().unwrap().break_points().is_empty());
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn test_save_as_keeps_active_path() {
        let fx = Fixture::new(&[b"video"]);
        let mut session = fx.session(AppConfig::default());
        session.new_annotations(&fx.annotations_path()).unwrap();
        session.open_video(&fx.videos[0], 100).unwrap();

        let copy = session.save_as(&fx.dir.path().join("copy")).unwrap();
        assert_eq!(copy, fx.dir.path().join("copy.json"));
        assert_eq!(AnnotationStore::new(&copy).load().unwrap().len(), 1);
        assert_eq!(session.annotation_path(), Some(fx.annotations_path().as_path()));
    }

    #[test]
    fn test_open_folder() {
        let fx = Fixture::new(&[b"a", b"b"]);
        let mut session = fx.session(AppConfig::default());
        assert_eq!(session.open_folder(fx.dir.path()).unwrap(), 2);
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.video().unwrap().path(), fx.videos[0].as_path());

        let empty = TempDir::new().unwrap();
        assert!(session.open_folder(empty.path()).is_err());
    }
}
