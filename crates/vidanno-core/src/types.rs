//! vidanno Core Type Definitions
//!
//! Defines fundamental types used throughout the annotation core.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Frame Types
// =============================================================================

/// Frame index within a video (0-based)
pub type FrameIndex = u64;

/// Content checksum (lowercase hex digest)
pub type Checksum = String;

/// Half-open frame interval `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameSpan {
    pub start: FrameIndex,
    pub end: FrameIndex,
}

impl FrameSpan {
    pub fn new(start: FrameIndex, end: FrameIndex) -> Self {
        Self { start, end }
    }

    /// Number of frames covered by the span
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Checks if the span contains the given frame
    pub fn contains(&self, frame: FrameIndex) -> bool {
        self.start <= frame && frame < self.end
    }
}

impl fmt::Display for FrameSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.start, self.end)
    }
}

/// Search direction for nearest break point / keyframe lookups
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Prev,
    Next,
}

// =============================================================================
// Rate Types
// =============================================================================

/// Ratio (for fps)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    /// Numerator
    pub num: i32,
    /// Denominator
    pub den: i32,
}

impl Ratio {
    /// Creates a new ratio with validation
    pub fn new(num: i32, den: i32) -> Self {
        if den == 0 {
            warn!("Ratio created with zero denominator, defaulting to 1");
            return Self { num, den: 1 };
        }
        Self { num, den }
    }

    /// Converts to floating point value
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f64 / self.den as f64
    }

    /// Duration in seconds of `frames` frames at this rate.
    ///
    /// Returns `None` for a non-positive rate.
    pub fn frames_to_secs(&self, frames: u64) -> Option<f64> {
        let fps = self.as_f64();
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        Some(frames as f64 / fps)
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self { num: 30, den: 1 } // Default 30fps
    }
}

impl std::str::FromStr for Ratio {
    type Err = String;

    /// Parses `"30"`, `"29.97"` or `"30000/1001"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((num, den)) = s.split_once('/') {
            let num = num
                .trim()
                .parse::<i32>()
                .map_err(|e| format!("Invalid frame rate numerator '{num}': {e}"))?;
            let den = den
                .trim()
                .parse::<i32>()
                .map_err(|e| format!("Invalid frame rate denominator '{den}': {e}"))?;
            return Ok(Ratio::new(num, den));
        }

        let value = s
            .parse::<f64>()
            .map_err(|e| format!("Invalid frame rate '{s}': {e}"))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(format!("Frame rate must be positive: {s}"));
        }
        if value.fract() == 0.0 {
            return Ok(Ratio::new(value as i32, 1));
        }
        Ok(Ratio::new((value * 1000.0).round() as i32, 1000))
    }
}
