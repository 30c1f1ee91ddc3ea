//! Loop Range Resolution
//!
//! Playback loops over a run of adjacent selected clips.

use crate::FrameSpan;

use super::Clip;

/// Returns the span of the first maximal run of adjacent selected clips.
///
/// Later runs are ignored. Returns `None` when nothing is selected.
pub fn connected_range(clips: &[Clip]) -> Option<FrameSpan> {
    let first = clips.iter().position(Clip::is_selected)?;
    let run = clips[first..]
        .iter()
        .take_while(|clip| clip.is_selected())
        .count();
    let last = &clips[first + run - 1];
    Some(FrameSpan::new(clips[first].start_frame(), last.end_frame()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(bounds: &[(u64, u64, bool)]) -> Vec<Clip> {
        bounds
            .iter()
            .map(|&(start, end, selected)| {
                let mut clip = Clip::new(start, end);
                clip.selected = selected;
                clip
            })
            .collect()
    }

    #[test]
    fn test_nothing_selected() {
        let clips = strip(&[(0, 10, false), (10, 20, false)]);
        assert_eq!(connected_range(&clips), None);
        assert_eq!(connected_range(&[]), None);
    }

    #[test]
    fn test_second_run_is_ignored() {
        let clips = strip(&[
            (0, 10, true),
            (10, 25, true),
            (25, 40, false),
            (40, 50, true),
        ]);
        assert_eq!(connected_range(&clips), Some(FrameSpan::new(0, 25)));
    }

    #[test]
    fn test_run_in_the_middle() {
        let clips = strip(&[(0, 10, false), (10, 20, true), (20, 30, false)]);
        assert_eq!(connected_range(&clips), Some(FrameSpan::new(10, 20)));
    }

    #[test]
    fn test_run_to_the_end() {
        let clips = strip(&[(0, 10, false), (10, 20, true), (20, 30, true)]);
        assert_eq!(connected_range(&clips), Some(FrameSpan::new(10, 30)));
    }
}
