//! Filesystem utilities.
//!
//! Crash-tolerant write primitives for the annotation file.
//! A partial write (power loss, crash) must never leave a previously valid
//! annotation file truncated. Windows semantics differ from Unix for
//! rename-over-existing; both are handled.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{CoreError, CoreResult};

/// Write bytes to `path` using an atomic replace pattern.
///
/// The bytes go to a hidden sibling temp file which is flushed, synced and
/// then renamed over the destination. If the destination exists it is first
/// moved aside as a `.bak` file and restored when the final rename fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_sibling(path);
    let written = (|| -> std::io::Result<()> {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    })();

    if let Err(e) = written {
        if tmp.is_file() {
            let _ = std::fs::remove_file(&tmp);
        }
        return Err(CoreError::IoError(e));
    }

    replace_with(path, &tmp)
}

/// Write a JSON value atomically with pretty formatting (2-space indent).
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

/// Returns `path` with its extension replaced, e.g. `clip.mp4` -> `clip.flow`.
pub fn paired_path(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

/// Temp file used while writing `path`: `.{name}.tmp.{pid}` in the same directory
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    sibling_with(path, |name| format!(".{name}.tmp.{}", std::process::id()))
}

fn backup_sibling(path: &Path) -> PathBuf {
    sibling_with(path, |name| format!("{name}.bak"))
}

fn sibling_with(path: &Path, name_for: impl FnOnce(&str) -> String) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "annotations".to_string());
    path.with_file_name(name_for(&file_name))
}

fn replace_with(dest: &Path, tmp: &Path) -> CoreResult<()> {
    if !dest.exists() {
        return std::fs::rename(tmp, dest).map_err(|e| {
            let _ = std::fs::remove_file(tmp);
            CoreError::IoError(e)
        });
    }

    let bak = backup_sibling(dest);
    if bak.exists() {
        let _ = std::fs::remove_file(&bak);
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(tmp, dest) {
        Ok(()) => {
            let _ = std::fs::remove_file(&bak);
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::rename(&bak, dest);
            let _ = std::fs::remove_file(tmp);
            Err(CoreError::IoError(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.json");

        write_atomic(&path, b"one").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one");

        write_atomic(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn test_write_atomic_leaves_no_sidecar_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.json");

        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["annotations.json".to_string()]);
    }

    #[test]
    fn test_failed_write_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.json");
        write_atomic(&path, b"valid").unwrap();

        // Occupy the temp path with a directory so creating the temp file fails.
        std::fs::create_dir(temp_sibling(&path)).unwrap();

        let result = write_atomic(&path, b"partial");
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "valid");
    }

    #[test]
    fn test_write_atomic_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("annotations.json");

        write_atomic(&path, b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_json_atomic_is_pretty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("value.json");

        write_json_atomic(&path, &serde_json::json!({ "a": 1 })).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_paired_path_replaces_extension() {
        let path = Path::new("/videos/take_01.mp4");
        assert_eq!(paired_path(path, "flow"), PathBuf::from("/videos/take_01.flow"));
    }
}
