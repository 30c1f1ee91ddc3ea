//! Annotation Store
//!
//! Reads and writes one annotation file. Saves go through a sibling temp file
//! and an atomic rename, so an interrupted save never truncates the previous
//! file.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{info, warn};

use crate::fs::write_json_atomic;
use crate::settings::{ApplicationInfo, APP_VERSION};
use crate::{CoreError, CoreResult};

use super::migration::{is_path_keyed, parse_version, rekey_by_checksum, schema_version};
use super::{AnnotationFile, AnnotationRecord, METAINFO_KEY};

/// Reads and writes the annotation file at one path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationStore {
    path: PathBuf,
}

impl AnnotationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads and, if needed, migrates the annotation file
    pub fn load(&self) -> CoreResult<AnnotationFile> {
        let content = fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&content)?;
        let file = decode_annotation_file(value)?;
        info!(
            "[annotations] Loaded annotations from {}, len={}",
            self.path.display(),
            file.len()
        );
        Ok(file)
    }

    /// Writes the metadata entry followed by every record in insertion order
    pub fn save(&self, file: &AnnotationFile) -> CoreResult<()> {
        write_json_atomic(&self.path, file)?;
        info!(
            "[annotations] Saved annotations to {}, len={}",
            self.path.display(),
            file.len()
        );
        Ok(())
    }

    /// Writes a new empty annotation file and returns it
    pub fn create_new(&self, metainfo: ApplicationInfo) -> CoreResult<AnnotationFile> {
        let file = AnnotationFile::new(metainfo);
        self.save(&file)?;
        Ok(file)
    }
}

/// Builds an annotation file from parsed JSON, migrating path-keyed files.
///
/// A file without a metadata entry is read as the current schema. Any record
/// that does not match the record shape fails the whole load.
pub fn decode_annotation_file(value: Value) -> CoreResult<AnnotationFile> {
    let Value::Object(mut entries) = value else {
        return Err(CoreError::UnsupportedSchema(
            "annotation file is not a JSON object".to_string(),
        ));
    };

    let metainfo = match entries.shift_remove(METAINFO_KEY) {
        Some(raw) => {
            if !raw.is_object() {
                return Err(CoreError::UnsupportedSchema(
                    "metadata entry is not an object".to_string(),
                ));
            }
            let version = schema_version(&raw)?;
            if is_path_keyed(&version) {
                info!(
                    "[annotations] Converting annotations from {} to {}",
                    version, APP_VERSION
                );
                entries = rekey_by_checksum(entries)?;
            } else if parse_version(APP_VERSION).is_ok_and(|current| version > current) {
                warn!(
                    "[annotations] File was written by a newer version {} (this is {})",
                    version, APP_VERSION
                );
            }
            serde_json::from_value::<ApplicationInfo>(raw)
                .map_err(|e| CoreError::UnsupportedSchema(format!("invalid metadata entry: {e}")))?
        }
        None => ApplicationInfo::default(),
    };

    let mut records = IndexMap::with_capacity(entries.len());
    for (key, raw) in entries {
        let record = serde_json::from_value::<AnnotationRecord>(raw).map_err(|e| {
            CoreError::MalformedRecord {
                key: key.clone(),
                reason: e.to_string(),
            }
        })?;
        records.insert(key, record);
    }

    Ok(AnnotationFile::from_parts(metainfo, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Lookup;
    use crate::clips::{ClipLabel, ClipPartition};
    use crate::FrameSpan;
    use indexmap::IndexSet;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_file() -> AnnotationFile {
        let mut partition = ClipPartition::new(100).unwrap();
        partition.toggle_break_point(40);
        let reasons: IndexSet<String> = ["1", "3.2"].iter().map(|s| s.to_string()).collect();
        partition.set_label(&[FrameSpan::new(0, 40)], ClipLabel::Accept, &reasons);
        partition.toggle_keyframe(12);

        let mut file = AnnotationFile::default();
        file.upsert("ffff", partition.to_record("/videos/b.mp4", "ffff"));
        file.upsert("0000", ClipPartition::new(5).unwrap().to_record("/videos/a.mp4", "0000"));
        file
    }

    #[test]
    fn test_save_then_load_preserves_order_and_fields() {
        let dir = TempDir::new().unwrap();
        let store = AnnotationStore::new(dir.path().join("annotations.json"));
        let file = sample_file();

        store.save(&file).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, file);
        let keys: Vec<&str> = loaded.records().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["ffff", "0000"]);
    }

    #[test]
    fn test_saved_file_layout() {
        let dir = TempDir::new().unwrap();
        let store = AnnotationStore::new(dir.path().join("annotations.json"));
        store.save(&sample_file()).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("{\n  \"<application:meta-info>\": {"));

        let value: Value = serde_json::from_str(&content).unwrap();
        let record = &value["ffff"];
        assert_eq!(record["filepath"], "/videos/b.mp4");
        assert_eq!(record["break_points"], json!([40]));
        assert_eq!(record["clips"][0]["label"], "Accept");
        assert_eq!(record["clips"][0]["reasons"], json!(["1", "3.2"]));
        assert_eq!(record["clips"][0]["keyframes"], json!([12]));
        assert_eq!(record["clips"][1]["label"], Value::Null);
        assert!(record["clips"][0].get("selected").is_none());
    }

    #[test]
    fn test_create_new_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = AnnotationStore::new(dir.path().join("new.json"));
        let file = store.create_new(ApplicationInfo::default()).unwrap();

        assert!(file.is_empty());
        assert!(store.exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = AnnotationStore::new(dir.path().join("missing.json"));
        assert!(store.load().unwrap_err().is_io());
    }

    // -------------------------------------------------------------------------
    // Decoding and migration
    // -------------------------------------------------------------------------

    #[test]
    fn test_path_keyed_file_is_migrated() {
        let value = json!({
            METAINFO_KEY: { "name": "Video Annotation Tool", "version": "0.1.0" },
            "/data/clip01.mp4": {
                "checksum": "abc123",
                "clips": [{ "start_frame": 0, "end_frame": 10, "label": "Reject", "reasons": ["1"], "keyframes": [] }],
                "break_points": []
            }
        });

        let file = decode_annotation_file(value).unwrap();
        assert_eq!(file.len(), 1);
        let Lookup::Found(record) = file.lookup("abc123", true) else {
            panic!("record not re-keyed");
        };
        assert_eq!(record.filepath, "/data/clip01.mp4");
        assert_eq!(record.clips[0].label(), ClipLabel::Reject);
        assert!(file.get("/data/clip01.mp4").is_none());
    }

    #[test]
    fn test_metainfo_without_version_is_migrated() {
        let value = json!({
            METAINFO_KEY: { "name": "Video Annotation Tool" },
            "a.mp4": { "checksum": "abc" }
        });
        let file = decode_annotation_file(value).unwrap();
        assert_eq!(file.get("abc").unwrap().filepath, "a.mp4");
    }

    #[test]
    fn test_file_without_metainfo_is_current_schema() {
        let value = json!({
            "abc": { "filepath": "x.mp4", "checksum": "abc", "clips": [], "break_points": [] }
        });
        let file = decode_annotation_file(value).unwrap();
        assert!(matches!(file.lookup("abc", true), Lookup::Found(_)));
    }

    #[test]
    fn test_malformed_record_fails_whole_load() {
        let value = json!({
            METAINFO_KEY: { "version": "0.2.0" },
            "good": { "filepath": "a", "checksum": "good", "clips": [], "break_points": [] },
            "bad": { "filepath": "b", "checksum": "bad", "clips": "nope" }
        });
        let err = decode_annotation_file(value).unwrap_err();
        assert!(matches!(err, CoreError::MalformedRecord { ref key, .. } if key == "bad"));
    }

    #[test]
    fn test_unrecognized_version_fails_load() {
        let value = json!({ METAINFO_KEY: { "version": "latest" } });
        assert!(matches!(
            decode_annotation_file(value),
            Err(CoreError::UnsupportedSchema(_))
        ));
    }

    #[test]
    fn test_non_object_file_fails_load() {
        assert!(decode_annotation_file(json!([1, 2])).is_err());
    }

    #[test]
    fn test_newer_version_still_loads() {
        let value = json!({
            METAINFO_KEY: { "version": "99.0.0" },
            "abc": { "filepath": "x.mp4", "checksum": "abc" }
        });
        let file = decode_annotation_file(value).unwrap();
        assert_eq!(file.metainfo.version, "99.0.0");
        assert_eq!(file.len(), 1);
    }
}
