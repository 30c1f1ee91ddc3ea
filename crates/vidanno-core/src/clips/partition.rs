//! Clip Partition
//!
//! The ordered set of break points of one video and the clips derived from
//! it. The clip list is a pure function of `break_points ∪ {0, total_frames}`;
//! every edit re-derives it and carries annotations over by exact bounds.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::annotations::AnnotationRecord;
use crate::{CoreError, CoreResult, Direction, FrameIndex, FrameSpan, Ratio};

use super::keyframes::KeyframeGenerator;
use super::loop_range::connected_range;
use super::models::{Clip, ClipLabel, ClipSummary};

/// Outcome of resetting the keyframes of the first selected Accept clip
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyframeReset {
    /// Existing keyframes were removed
    Cleared { span: FrameSpan, removed: usize },
    /// Keyframes were generated from the flow signal
    Generated { span: FrameSpan, keyframes: Vec<FrameIndex> },
}

/// Partition of `[0, total_frames)` into contiguous clips
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipPartition {
    total_frames: FrameIndex,
    break_points: BTreeSet<FrameIndex>,
    clips: Vec<Clip>,
    /// Clips that vanished in the last re-derivation, keyed by bounds
    detached: HashMap<(FrameIndex, FrameIndex), Clip>,
}

impl ClipPartition {
    /// Creates a partition with a single unlabeled clip `[0, total_frames)`
    pub fn new(total_frames: FrameIndex) -> CoreResult<Self> {
        if total_frames == 0 {
            return Err(CoreError::InvalidFrameCount(total_frames));
        }
        Ok(Self {
            total_frames,
            break_points: BTreeSet::new(),
            clips: vec![Clip::new(0, total_frames)],
            detached: HashMap::new(),
        })
    }

    // =========================================================================
    // Read-only Views
    // =========================================================================

    pub fn total_frames(&self) -> FrameIndex {
        self.total_frames
    }

    pub fn break_points(&self) -> &BTreeSet<FrameIndex> {
        &self.break_points
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Returns the clip containing `frame`
    pub fn clip_at(&self, frame: FrameIndex) -> Option<&Clip> {
        self.index_at(frame).map(|i| &self.clips[i])
    }

    fn index_at(&self, frame: FrameIndex) -> Option<usize> {
        let index = self.clips.partition_point(|clip| clip.end_frame <= frame);
        self.clips
            .get(index)
            .filter(|clip| clip.contains_frame(frame))
            .map(|_| index)
    }

    fn index_of(&self, span: FrameSpan) -> Option<usize> {
        self.index_at(span.start)
            .filter(|&i| self.clips[i].end_frame == span.end)
    }

    /// Details table rows, one per clip
    pub fn summaries(&self, fps: Option<Ratio>) -> Vec<ClipSummary> {
        self.clips.iter().map(|clip| clip.summary(fps)).collect()
    }

    // =========================================================================
    // Break Points
    // =========================================================================

    /// Inserts or removes a break point at `frame`.
    ///
    /// Returns false without touching state for frames outside
    /// `(0, total_frames)`.
    pub fn toggle_break_point(&mut self, frame: FrameIndex) -> bool {
        if frame == 0 || frame >= self.total_frames {
            debug!("[clips] Refused break point at frame {}", frame);
            return false;
        }

        if self.break_points.remove(&frame) {
            debug!("[clips] Removed break point at frame {}", frame);
        } else {
            self.break_points.insert(frame);
            debug!("[clips] Added break point at frame {}", frame);
        }
        self.rederive();
        true
    }

    /// Removes every listed break point. Frames that are not break points are
    /// ignored. Returns true if anything was removed.
    pub fn remove_break_points_at<I>(&mut self, frames: I) -> bool
    where
        I: IntoIterator<Item = FrameIndex>,
    {
        let before = self.break_points.len();
        for frame in frames {
            self.break_points.remove(&frame);
        }
        let removed = before - self.break_points.len();
        if removed == 0 {
            return false;
        }

        debug!("[clips] Removed {} break points", removed);
        self.rederive();
        true
    }

    /// Merges every selected clip into its neighbours by removing its bounds
    pub fn remove_selected_clips(&mut self) -> bool {
        let bounds: Vec<FrameIndex> = self
            .clips
            .iter()
            .filter(|clip| clip.selected)
            .flat_map(|clip| [clip.start_frame, clip.end_frame])
            .collect();
        self.remove_break_points_at(bounds)
    }

    /// Nearest break point strictly before or after `frame`
    pub fn nearest_break_point(&self, frame: FrameIndex, direction: Direction) -> Option<FrameIndex> {
        match direction {
            Direction::Prev => self.break_points.range(..frame).next_back().copied(),
            Direction::Next => self
                .break_points
                .range((std::ops::Bound::Excluded(frame), std::ops::Bound::Unbounded))
                .next()
                .copied(),
        }
    }

    /// Rebuilds the clip list from the break points.
    ///
    /// A new clip inherits the annotation of the current clip with the same
    /// bounds, or of a clip detached by the previous re-derivation. Only one
    /// step is remembered: undoing the last break point edit restores what it
    /// removed, any further edit forgets it.
    fn rederive(&mut self) {
        let mut previous: HashMap<(FrameIndex, FrameIndex), Clip> = self
            .clips
            .drain(..)
            .map(|clip| ((clip.start_frame, clip.end_frame), clip))
            .collect();

        let mut start = 0;
        for end in self
            .break_points
            .iter()
            .copied()
            .chain(std::iter::once(self.total_frames))
        {
            let mut clip = Clip::new(start, end);
            if let Some(old) = previous
                .remove(&(start, end))
                .or_else(|| self.detached.remove(&(start, end)))
            {
                clip.inherit_from(old);
            }
            self.clips.push(clip);
            start = end;
        }

        previous.retain(|_, clip| !clip.is_blank() || clip.selected);
        self.detached = previous;
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Flips the selection of the clip containing `frame`
    pub fn toggle_selection(&mut self, frame: FrameIndex) -> bool {
        match self.index_at(frame) {
            Some(i) => {
                let clip = &mut self.clips[i];
                clip.selected = !clip.selected;
                true
            }
            None => false,
        }
    }

    /// Selects the clip with exactly these bounds
    pub fn select(&mut self, span: FrameSpan) -> bool {
        match self.index_of(span) {
            Some(i) => {
                self.clips[i].selected = true;
                true
            }
            None => false,
        }
    }

    /// Deselects every clip. Returns true if any selection changed.
    pub fn clear_selection(&mut self) -> bool {
        let mut changed = false;
        for clip in self.clips.iter_mut().filter(|clip| clip.selected) {
            clip.selected = false;
            changed = true;
        }
        if changed {
            debug!("[clips] Cleared all selections");
        }
        changed
    }

    pub fn selected_spans(&self) -> Vec<FrameSpan> {
        self.clips
            .iter()
            .filter(|clip| clip.selected)
            .map(Clip::span)
            .collect()
    }

    /// Start of the first selected clip
    pub fn first_selected_start(&self) -> Option<FrameIndex> {
        self.clips
            .iter()
            .find(|clip| clip.selected)
            .map(Clip::start_frame)
    }

    /// Loop range over the first run of adjacent selected clips
    pub fn loop_range(&self) -> Option<FrameSpan> {
        connected_range(&self.clips)
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// Labels the clips with exactly the given bounds. Unknown spans are
    /// skipped. Returns the number of clips labeled.
    pub fn set_label(
        &mut self,
        spans: &[FrameSpan],
        label: ClipLabel,
        reasons: &IndexSet<String>,
    ) -> usize {
        let mut count = 0;
        for span in spans {
            if let Some(i) = self.index_of(*span) {
                self.clips[i].apply_label(label, reasons);
                count += 1;
            }
        }
        debug!("[clips] Set label {:?} on {} clips", label, count);
        count
    }

    /// Labels every selected clip and deselects them.
    ///
    /// Clearing the label of a selection with no labeled clip is a no-op.
    pub fn label_selected(&mut self, label: ClipLabel, reasons: &IndexSet<String>) -> usize {
        let selected: Vec<usize> = (0..self.clips.len())
            .filter(|&i| self.clips[i].selected)
            .collect();
        if selected.is_empty() {
            return 0;
        }
        if !label.is_set() && !selected.iter().any(|&i| self.clips[i].label.is_set()) {
            return 0;
        }

        for &i in &selected {
            let clip = &mut self.clips[i];
            clip.apply_label(label, reasons);
            clip.selected = false;
        }
        debug!(
            "[clips] Set label {:?} on {} selected clips",
            label,
            selected.len()
        );
        selected.len()
    }

    // =========================================================================
    // Keyframes
    // =========================================================================

    /// Adds or removes a keyframe in the Accept clip containing `frame`
    pub fn toggle_keyframe(&mut self, frame: FrameIndex) -> bool {
        let Some(i) = self.index_at(frame) else {
            return false;
        };
        let clip = &mut self.clips[i];
        if clip.label != ClipLabel::Accept {
            return false;
        }

        if clip.keyframes.remove(&frame) {
            debug!("[clips] Removed keyframe at frame {}", frame);
        } else {
            clip.keyframes.insert(frame);
            debug!("[clips] Added keyframe at frame {}", frame);
        }
        true
    }

    /// Nearest keyframe of any Accept clip strictly before or after `frame`
    pub fn nearest_keyframe(&self, frame: FrameIndex, direction: Direction) -> Option<FrameIndex> {
        let keyframes = self
            .clips
            .iter()
            .filter(|clip| clip.label == ClipLabel::Accept)
            .flat_map(|clip| clip.keyframes.iter().copied());

        match direction {
            Direction::Prev => keyframes.filter(|&k| k < frame).max(),
            Direction::Next => keyframes.filter(|&k| k > frame).min(),
        }
    }

    /// Replaces the keyframes of the Accept clip containing `frame` with
    /// generated ones. Returns `Ok(false)` if there is no such clip.
    pub fn generate_keyframes_at(
        &mut self,
        frame: FrameIndex,
        flow: &[f64],
        generator: &KeyframeGenerator,
    ) -> CoreResult<bool> {
        let Some(i) = self.index_at(frame) else {
            return Ok(false);
        };
        if self.clips[i].label != ClipLabel::Accept {
            return Ok(false);
        }

        let keyframes = generator.generate(self.clips[i].span(), flow)?;
        self.clips[i].keyframes = keyframes.into_iter().collect();
        Ok(true)
    }

    /// For the first selected Accept clip: clears its keyframes if it has
    /// any, otherwise generates them. The clip is deselected afterwards.
    pub fn reset_first_selected_keyframes(
        &mut self,
        flow: &[f64],
        generator: &KeyframeGenerator,
    ) -> CoreResult<Option<KeyframeReset>> {
        let Some(i) = self
            .clips
            .iter()
            .position(|clip| clip.selected && clip.label == ClipLabel::Accept)
        else {
            return Ok(None);
        };

        let span = self.clips[i].span();
        let outcome = if self.clips[i].keyframes.is_empty() {
            let keyframes = generator.generate(span, flow)?;
            self.clips[i].keyframes = keyframes.iter().copied().collect();
            debug!(
                "[clips] Generated keyframes for clip {}: count={}",
                span,
                keyframes.len()
            );
            KeyframeReset::Generated { span, keyframes }
        } else {
            let removed = self.clips[i].keyframes.len();
            self.clips[i].keyframes.clear();
            debug!("[clips] Cleared {} keyframes for clip {}", removed, span);
            KeyframeReset::Cleared { span, removed }
        };

        self.clips[i].selected = false;
        Ok(Some(outcome))
    }

    // =========================================================================
    // Snapshot / Restore
    // =========================================================================

    /// Snapshot of the partition for persistence
    pub fn to_record(&self, filepath: impl Into<String>, checksum: impl Into<String>) -> AnnotationRecord {
        AnnotationRecord {
            filepath: filepath.into(),
            checksum: checksum.into(),
            clips: self.clips.clone(),
            break_points: self.break_points.iter().copied().collect(),
        }
    }

    /// Rebuilds a partition from a stored record.
    ///
    /// Clips are re-derived from the stored break points, then stored
    /// annotations are applied by exact bounds. Anything that would break a
    /// clip invariant is dropped with a warning.
    pub fn from_record(total_frames: FrameIndex, record: &AnnotationRecord) -> CoreResult<Self> {
        let mut partition = Self::new(total_frames)?;

        for &frame in &record.break_points {
            if frame == 0 || frame >= total_frames {
                warn!(
                    "[clips] Dropping stored break point {} outside (0, {}) for {}",
                    frame, total_frames, record.checksum
                );
                continue;
            }
            partition.break_points.insert(frame);
        }
        partition.rederive();

        for stored in &record.clips {
            let span = stored.span();
            let Some(i) = partition.index_of(span) else {
                if !stored.is_blank() {
                    warn!(
                        "[clips] Dropping annotation of clip {} with no matching bounds",
                        span
                    );
                }
                continue;
            };

            let clip = &mut partition.clips[i];
            clip.label = stored.label;
            if stored.label.is_set() {
                clip.reasons = stored.reasons.clone();
            } else if !stored.reasons.is_empty() {
                warn!("[clips] Dropping reasons of unlabeled clip {}", span);
            }

            if stored.label == ClipLabel::Accept {
                for &frame in &stored.keyframes {
                    if span.contains(frame) {
                        clip.keyframes.insert(frame);
                    } else {
                        warn!(
                            "[clips] Dropping keyframe {} outside clip {}",
                            frame, span
                        );
                    }
                }
            } else if !stored.keyframes.is_empty() {
                warn!("[clips] Dropping keyframes of non-accepted clip {}", span);
            }
        }

        Ok(partition)
    }
}
