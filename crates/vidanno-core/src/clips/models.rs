//! Clip Model Definitions
//!
//! A clip is a half-open frame interval carrying an optional verdict, the
//! reasons behind it, and (for accepted clips) a set of keyframes.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{FrameIndex, FrameSpan, Ratio};

// =============================================================================
// Label
// =============================================================================

/// Verdict attached to a clip. Persisted as `"Accept"`, `"Reject"` or `null`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<Verdict>", into = "Option<Verdict>")]
pub enum ClipLabel {
    #[default]
    None,
    Accept,
    Reject,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
enum Verdict {
    Accept,
    Reject,
}

impl From<Option<Verdict>> for ClipLabel {
    fn from(value: Option<Verdict>) -> Self {
        match value {
            Some(Verdict::Accept) => ClipLabel::Accept,
            Some(Verdict::Reject) => ClipLabel::Reject,
            None => ClipLabel::None,
        }
    }
}

impl From<ClipLabel> for Option<Verdict> {
    fn from(value: ClipLabel) -> Self {
        match value {
            ClipLabel::Accept => Some(Verdict::Accept),
            ClipLabel::Reject => Some(Verdict::Reject),
            ClipLabel::None => None,
        }
    }
}

impl ClipLabel {
    /// Returns true for Accept or Reject
    pub fn is_set(&self) -> bool {
        !matches!(self, ClipLabel::None)
    }

    /// Display name, empty for None
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipLabel::None => "",
            ClipLabel::Accept => "Accept",
            ClipLabel::Reject => "Reject",
        }
    }

    /// Single-letter marker used in clip strips and tables
    pub fn initial(&self) -> &'static str {
        match self {
            ClipLabel::None => "",
            ClipLabel::Accept => "A",
            ClipLabel::Reject => "R",
        }
    }
}

impl std::str::FromStr for ClipLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" | "a" => Ok(ClipLabel::Accept),
            "reject" | "r" => Ok(ClipLabel::Reject),
            "none" | "clear" | "" => Ok(ClipLabel::None),
            other => Err(format!("Unknown label '{other}' (expected accept, reject or none)")),
        }
    }
}

// =============================================================================
// Clip
// =============================================================================

/// Contiguous frame range `[start_frame, end_frame)` with its annotation.
///
/// Fields are read-only outside the crate; changes go through
/// [`ClipPartition`](super::ClipPartition) commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub(crate) start_frame: FrameIndex,
    pub(crate) end_frame: FrameIndex,
    #[serde(default)]
    pub(crate) label: ClipLabel,
    #[serde(default)]
    pub(crate) reasons: IndexSet<String>,
    #[serde(default)]
    pub(crate) keyframes: BTreeSet<FrameIndex>,
    /// Transient UI selection, never persisted
    #[serde(skip)]
    pub(crate) selected: bool,
}

impl Clip {
    /// Creates an unlabeled, unselected clip
    pub fn new(start_frame: FrameIndex, end_frame: FrameIndex) -> Self {
        Self {
            start_frame,
            end_frame,
            label: ClipLabel::None,
            reasons: IndexSet::new(),
            keyframes: BTreeSet::new(),
            selected: false,
        }
    }

    pub fn start_frame(&self) -> FrameIndex {
        self.start_frame
    }

    pub fn end_frame(&self) -> FrameIndex {
        self.end_frame
    }

    pub fn span(&self) -> FrameSpan {
        FrameSpan::new(self.start_frame, self.end_frame)
    }

    pub fn label(&self) -> ClipLabel {
        self.label
    }

    pub fn reasons(&self) -> &IndexSet<String> {
        &self.reasons
    }

    pub fn keyframes(&self) -> &BTreeSet<FrameIndex> {
        &self.keyframes
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Number of frames in the clip
    pub fn len(&self) -> u64 {
        self.span().len()
    }

    pub fn is_empty(&self) -> bool {
        self.span().is_empty()
    }

    /// Checks if the clip contains the given frame
    pub fn contains_frame(&self, frame: FrameIndex) -> bool {
        self.span().contains(frame)
    }

    /// Returns true if the clip carries no label, reasons or keyframes
    pub fn is_blank(&self) -> bool {
        !self.label.is_set() && self.reasons.is_empty() && self.keyframes.is_empty()
    }

    /// Sets label and reasons together, dropping keyframes unless accepted
    pub(crate) fn apply_label(&mut self, label: ClipLabel, reasons: &IndexSet<String>) {
        self.label = label;
        if label.is_set() {
            self.reasons = reasons.clone();
        } else {
            self.reasons.clear();
        }
        if label != ClipLabel::Accept {
            self.keyframes.clear();
        }
    }

    /// Copies annotation and selection from a clip with identical bounds
    pub(crate) fn inherit_from(&mut self, previous: Clip) {
        self.label = previous.label;
        self.reasons = previous.reasons;
        self.keyframes = previous.keyframes;
        self.selected = previous.selected;
    }

    /// Row for a clip details table
    pub fn summary(&self, fps: Option<Ratio>) -> ClipSummary {
        ClipSummary {
            interval: self.span().to_string(),
            duration_secs: fps.and_then(|r| r.frames_to_secs(self.len())),
            label: self.label.initial().to_string(),
            reasons: self
                .reasons
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            keyframes: self
                .keyframes
                .iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            selected: self.selected,
        }
    }
}

// =============================================================================
// Clip Summary
// =============================================================================

/// Read-only clip row for details tables
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSummary {
    /// `[start,end)`
    pub interval: String,
    /// Duration in seconds, when the frame rate is known
    pub duration_secs: Option<f64>,
    /// `A`, `R` or empty
    pub label: String,
    pub reasons: String,
    pub keyframes: String,
    pub selected: bool,
}
