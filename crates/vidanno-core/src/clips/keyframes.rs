//! Keyframe Generation
//!
//! Single-pass accumulation over the flow signal: the first frame of a clip
//! is always a keyframe, then a new keyframe is emitted every time the
//! accumulated motion since the previous one strictly exceeds the threshold.

use tracing::debug;

use crate::{CoreError, CoreResult, FrameIndex, FrameSpan};

/// Default accumulated-motion threshold
pub const DEFAULT_FLOW_THRESHOLD: f64 = 0.2;

/// Selects keyframes inside one clip from a flow signal
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyframeGenerator {
    threshold: f64,
}

impl Default for KeyframeGenerator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FLOW_THRESHOLD,
        }
    }
}

impl KeyframeGenerator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Generates sorted keyframes for `span`.
    ///
    /// `flow` is indexed by absolute frame: `flow[i]` is the motion between
    /// frames `i` and `i + 1`. A clip of length one needs no flow values.
    pub fn generate(&self, span: FrameSpan, flow: &[f64]) -> CoreResult<Vec<FrameIndex>> {
        if span.is_empty() {
            return Ok(Vec::new());
        }

        let needed = if span.len() > 1 { (span.end - 1) as usize } else { 0 };
        if flow.len() < needed {
            return Err(CoreError::FlowSignalTooShort {
                start_frame: span.start,
                end_frame: span.end,
                needed,
                available: flow.len(),
            });
        }

        let mut keyframes = vec![span.start];
        let mut accumulated = 0.0;
        for frame in (span.start + 1)..span.end {
            accumulated += flow[(frame - 1) as usize];
            if accumulated > self.threshold {
                keyframes.push(frame);
                accumulated = 0.0;
            }
        }

        debug!(
            "[keyframes] Generated {} keyframes for {} (threshold={})",
            keyframes.len(),
            span,
            self.threshold
        );
        Ok(keyframes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_must_be_strictly_exceeded() {
        let flow = vec![0.05; 20];
        let keyframes = KeyframeGenerator::default()
            .generate(FrameSpan::new(10, 20), &flow)
            .unwrap();
        assert_eq!(keyframes, vec![10, 15]);
    }

    #[test]
    fn test_single_frame_clip_needs_no_flow() {
        let keyframes = KeyframeGenerator::default()
            .generate(FrameSpan::new(7, 8), &[])
            .unwrap();
        assert_eq!(keyframes, vec![7]);
    }

    #[test]
    fn test_still_clip_yields_start_only() {
        let flow = vec![0.0; 100];
        let keyframes = KeyframeGenerator::default()
            .generate(FrameSpan::new(0, 100), &flow)
            .unwrap();
        assert_eq!(keyframes, vec![0]);
    }

    #[test]
    fn test_large_motion_marks_every_frame() {
        let flow = vec![1.0; 5];
        let keyframes = KeyframeGenerator::new(0.5)
            .generate(FrameSpan::new(0, 6), &flow)
            .unwrap();
        assert_eq!(keyframes, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_uses_absolute_flow_indices() {
        // Only the transition 3 -> 4 moves.
        let mut flow = vec![0.0; 9];
        flow[3] = 0.5;
        let keyframes = KeyframeGenerator::default()
            .generate(FrameSpan::new(2, 10), &flow)
            .unwrap();
        assert_eq!(keyframes, vec![2, 4]);
    }

    // -------------------------------------------------------------------------
    // Short signals
    // -------------------------------------------------------------------------

    #[test]
    fn test_short_flow_is_an_error() {
        let err = KeyframeGenerator::default()
            .generate(FrameSpan::new(0, 10), &[0.1; 8])
            .unwrap_err();
        match err {
            CoreError::FlowSignalTooShort {
                needed, available, ..
            } => {
                assert_eq!(needed, 9);
                assert_eq!(available, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_exact_length_flow_is_enough() {
        let keyframes = KeyframeGenerator::default()
            .generate(FrameSpan::new(0, 10), &[0.0; 9])
            .unwrap();
        assert_eq!(keyframes, vec![0]);
    }
}
