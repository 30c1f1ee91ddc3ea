//! Annotation Schema Migration
//!
//! Files written before 0.1.1 filed records under the video path instead of
//! the content checksum. Loading such a file re-keys every record by the
//! checksum it carries and keeps the old key as its `filepath`.

use semver::Version;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{CoreError, CoreResult};

/// First schema version that files records under their checksum
pub const CHECKSUM_KEYED_SINCE: Version = Version::new(0, 1, 1);

/// Version assumed for a metadata entry without one
pub const UNVERSIONED: Version = Version::new(0, 0, 0);

/// Parses a metadata version. Accepts full semver as well as the shortened
/// `MAJOR` and `MAJOR.MINOR` forms.
pub fn parse_version(text: &str) -> CoreResult<Version> {
    let text = text.trim();
    if let Ok(version) = Version::parse(text) {
        return Ok(version);
    }

    let parts: Vec<&str> = text.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(CoreError::UnsupportedSchema(format!(
            "unrecognized version '{text}'"
        )));
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part.parse().map_err(|_| {
            CoreError::UnsupportedSchema(format!("unrecognized version '{text}'"))
        })?;
    }
    Ok(Version::new(numbers[0], numbers[1], numbers[2]))
}

/// Reads the schema version from a raw metadata entry
pub fn schema_version(metainfo: &Value) -> CoreResult<Version> {
    match metainfo.get("version") {
        None | Some(Value::Null) => Ok(UNVERSIONED),
        Some(Value::String(text)) => parse_version(text),
        Some(other) => Err(CoreError::UnsupportedSchema(format!(
            "version must be a string, found {other}"
        ))),
    }
}

/// Checks if records of this version are filed by path
pub fn is_path_keyed(version: &Version) -> bool {
    *version < CHECKSUM_KEYED_SINCE
}

/// Re-keys path-keyed entries by their embedded checksum.
///
/// `filepath` is set to the old key unless the record already has one.
/// Every other field is kept unchanged.
pub fn rekey_by_checksum(entries: Map<String, Value>) -> CoreResult<Map<String, Value>> {
    let total = entries.len();
    let mut rekeyed = Map::with_capacity(total);

    for (path, value) in entries {
        let Value::Object(fields) = value else {
            return Err(CoreError::MalformedRecord {
                key: path,
                reason: "record is not an object".to_string(),
            });
        };
        let checksum = match fields.get("checksum") {
            Some(Value::String(checksum)) => checksum.clone(),
            _ => {
                return Err(CoreError::MalformedRecord {
                    key: path,
                    reason: "missing string field 'checksum'".to_string(),
                })
            }
        };

        let mut record = Map::with_capacity(fields.len() + 1);
        record.insert("filepath".to_string(), Value::String(path.clone()));
        record.extend(fields);

        if rekeyed.insert(checksum.clone(), Value::Object(record)).is_some() {
            warn!(
                "[annotations] Duplicate checksum {} while migrating {}, keeping the later record",
                checksum, path
            );
        }
    }

    info!(
        "[annotations] Migrated {} path-keyed records to {} checksum-keyed records",
        total,
        rekeyed.len()
    );
    Ok(rekeyed)
}
