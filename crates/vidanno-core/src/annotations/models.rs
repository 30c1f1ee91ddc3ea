//! Annotation File Model Definitions
//!
//! An annotation file maps content checksums to the stored partition of each
//! video, preceded by one reserved metadata entry.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::clips::Clip;
use crate::settings::ApplicationInfo;
use crate::{Checksum, FrameIndex};

/// Reserved key of the metadata entry
pub const METAINFO_KEY: &str = "<application:meta-info>";

// =============================================================================
// Record
// =============================================================================

/// Stored state of one video
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Last known path, informational only
    #[serde(default)]
    pub filepath: String,
    /// Content checksum; should equal the key the record is filed under
    pub checksum: Checksum,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub break_points: Vec<FrameIndex>,
}

impl AnnotationRecord {
    /// Frame count implied by the stored clips, if any
    pub fn frame_count_hint(&self) -> Option<FrameIndex> {
        self.clips.iter().map(Clip::end_frame).max()
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Result of looking up a checksum in an annotation file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// A record is filed under the checksum and carries it
    Found(&'a AnnotationRecord),
    /// A record is filed under the checksum but carries a different one
    Mismatch(&'a AnnotationRecord),
    /// Nothing is filed under the checksum
    Missing,
}

// =============================================================================
// Annotation File
// =============================================================================

/// In-memory annotation file: metadata plus records in insertion order
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationFile {
    pub metainfo: ApplicationInfo,
    records: IndexMap<Checksum, AnnotationRecord>,
}

impl Default for AnnotationFile {
    fn default() -> Self {
        Self::new(ApplicationInfo::default())
    }
}

impl AnnotationFile {
    /// Creates an empty file stamped with the given application identity
    pub fn new(metainfo: ApplicationInfo) -> Self {
        Self {
            metainfo,
            records: IndexMap::new(),
        }
    }

    pub(crate) fn from_parts(
        metainfo: ApplicationInfo,
        records: IndexMap<Checksum, AnnotationRecord>,
    ) -> Self {
        Self { metainfo, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn records(&self) -> impl Iterator<Item = (&Checksum, &AnnotationRecord)> {
        self.records.iter()
    }

    pub fn get(&self, key: &str) -> Option<&AnnotationRecord> {
        self.records.get(key)
    }

    /// Looks up `checksum`. With `validate` set, a record whose own checksum
    /// differs from its key is reported as a mismatch.
    pub fn lookup(&self, checksum: &str, validate: bool) -> Lookup<'_> {
        match self.records.get(checksum) {
            Some(record) if validate && record.checksum != checksum => Lookup::Mismatch(record),
            Some(record) => Lookup::Found(record),
            None => Lookup::Missing,
        }
    }

    /// Replaces the record under `checksum` in place, or appends it
    pub fn upsert(&mut self, checksum: impl Into<Checksum>, record: AnnotationRecord) {
        self.records.insert(checksum.into(), record);
    }

    /// Moves a mismatched record under `key` out of the way so a fresh
    /// record can take its place.
    ///
    /// The record goes to the checksum it carries, or to `<checksum>.stale`
    /// (numbered if needed) when that key is taken. Returns the new key, or
    /// `None` when the record under `key` is not mismatched.
    pub fn refile_mismatched(&mut self, key: &str) -> Option<Checksum> {
        let carried = match self.records.get(key) {
            Some(record) if record.checksum != key => record.checksum.clone(),
            _ => return None,
        };

        let mut target = carried.clone();
        let mut n = 1;
        while self.records.contains_key(&target) {
            target = if n == 1 {
                format!("{carried}.stale")
            } else {
                format!("{carried}.stale.{n}")
            };
            n += 1;
        }
        if target != carried {
            warn!(
                "[annotations] Key {} already taken, keeping stale record under {}",
                carried, target
            );
        }

        let record = self.records.shift_remove(key)?;
        self.records.insert(target.clone(), record);
        Some(target)
    }
}

impl Serialize for AnnotationFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len() + 1))?;
        map.serialize_entry(METAINFO_KEY, &self.metainfo)?;
        for (checksum, record) in &self.records {
            map.serialize_entry(checksum, record)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(checksum: &str) -> AnnotationRecord {
        AnnotationRecord {
            filepath: format!("/videos/{checksum}.mp4"),
            checksum: checksum.to_string(),
            clips: vec![Clip::new(0, 10)],
            break_points: Vec::new(),
        }
    }

    #[test]
    fn test_lookup_branches() {
        let mut file = AnnotationFile::default();
        file.upsert("aaa", record("aaa"));
        file.upsert("bbb", record("zzz"));

        assert!(matches!(file.lookup("aaa", true), Lookup::Found(_)));
        assert!(matches!(file.lookup("bbb", true), Lookup::Mismatch(r) if r.checksum == "zzz"));
        assert!(matches!(file.lookup("bbb", false), Lookup::Found(_)));
        assert_eq!(file.lookup("ccc", true), Lookup::Missing);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut file = AnnotationFile::default();
        file.upsert("a", record("a"));
        file.upsert("b", record("b"));
        file.upsert("c", record("c"));

        let mut updated = record("a");
        updated.break_points = vec![5];
        file.upsert("a", updated);

        let keys: Vec<&str> = file.records().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(file.get("a").unwrap().break_points, vec![5]);
    }

    #[test]
    fn test_metainfo_serialized_first() {
        let mut file = AnnotationFile::default();
        file.upsert("b", record("b"));
        file.upsert("a", record("a"));

        let value = serde_json::to_value(&file).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec![METAINFO_KEY, "b", "a"]);
        assert_eq!(value[METAINFO_KEY]["name"], "Video Annotation Tool");
    }

    #[test]
    fn test_refile_mismatched() {
        let mut file = AnnotationFile::default();
        file.upsert("new", record("old"));

        assert_eq!(file.refile_mismatched("new"), Some("old".to_string()));
        assert!(file.get("new").is_none());
        assert_eq!(file.get("old").unwrap().checksum, "old");

        // Matching records stay put; a taken key gets a stale suffix.
        assert_eq!(file.refile_mismatched("old"), None);
        file.upsert("x", record("old"));
        assert_eq!(file.refile_mismatched("x"), Some("old.stale".to_string()));
        assert!(file.get("x").is_none());
        file.upsert("y", record("old"));
        assert_eq!(file.refile_mismatched("y"), Some("old.stale.2".to_string()));
        assert_eq!(file.len(), 3);
    }

    #[test]
    fn test_frame_count_hint() {
        let mut r = record("a");
        assert_eq!(r.frame_count_hint(), Some(10));
        r.clips.clear();
        assert_eq!(r.frame_count_hint(), None);
    }
}
