//! Video Folder Scanner
//!
//! Recursively collects the videos of a folder into a playlist.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

/// Extensions picked up when scanning a folder
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

fn is_video(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Returns every video under `folder`, sorted by path.
///
/// Flow caches and other sidecar files are skipped, as are unreadable
/// entries.
pub fn discover_videos(folder: &Path) -> Vec<PathBuf> {
    let mut videos = Vec::new();
    for entry in WalkDir::new(folder).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry during scan");
                continue;
            }
        };
        if entry.file_type().is_file() && is_video(entry.path()) {
            videos.push(entry.into_path());
        }
    }
    videos.sort();

    info!(
        "[playlist] Found {} video files in {}",
        videos.len(),
        folder.display()
    );
    videos
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_videos_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("day2")).unwrap();
        for name in ["b.mp4", "a.MP4", "a.flow", "notes.txt", "day2/c.mp4"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let videos = discover_videos(dir.path());
        let names: Vec<String> = videos
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["a.MP4", "b.mp4", "day2/c.mp4"]);
    }

    #[test]
    fn test_discover_videos_missing_folder() {
        let dir = TempDir::new().unwrap();
        assert!(discover_videos(&dir.path().join("missing")).is_empty());
    }
}
