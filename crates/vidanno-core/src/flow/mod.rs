//! Motion Flow Signal
//!
//! The flow signal is computed elsewhere (optical flow between adjacent
//! frames, normalized by the frame diagonal). The core only consumes it:
//! value `i` is the motion magnitude of the transition from frame `i` to
//! frame `i + 1`.
//!
//! Cached signals live next to the video, sharing its stem, in a small binary
//! format: a 4-byte little-endian signed count `N` followed by `N`
//! little-endian IEEE-754 doubles.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::fs::{paired_path, write_atomic};
use crate::{CoreError, CoreResult};

/// Extension of the flow cache paired with each video
pub const FLOW_CACHE_EXTENSION: &str = "flow";

const COUNT_BYTES: usize = 4;
const VALUE_BYTES: usize = 8;

/// Source of per-transition motion magnitudes for a video
pub trait FlowSignal {
    /// Returns one value per adjacent frame pair of `video`
    fn compute(&self, video: &Path) -> CoreResult<Vec<f64>>;
}

/// Reads flow signals from the binary cache paired with each video
#[derive(Clone, Debug, Default)]
pub struct FlowCache;

impl FlowCache {
    /// Cache file path for a video
    pub fn cache_path(video: &Path) -> PathBuf {
        paired_path(video, FLOW_CACHE_EXTENSION)
    }

    /// Checks if a cache exists for the video
    pub fn exists(video: &Path) -> bool {
        Self::cache_path(video).is_file()
    }
}

impl FlowSignal for FlowCache {
    fn compute(&self, video: &Path) -> CoreResult<Vec<f64>> {
        let path = Self::cache_path(video);
        let values = read_flow_file(&path)?;
        debug!(
            "[flow] Loaded flow signal from {}, length={}",
            path.display(),
            values.len()
        );
        Ok(values)
    }
}

/// Encodes a flow signal into the cache format
pub fn encode_flow(values: &[f64]) -> CoreResult<Vec<u8>> {
    let count = i32::try_from(values.len()).map_err(|_| {
        CoreError::ValidationError(format!(
            "Flow signal has {} values, more than the cache format can hold",
            values.len()
        ))
    })?;

    let mut bytes = Vec::with_capacity(COUNT_BYTES + values.len() * VALUE_BYTES);
    bytes.extend_from_slice(&count.to_le_bytes());
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

/// Decodes the cache format. `origin` only names the source in errors.
pub fn decode_flow(bytes: &[u8], origin: &Path) -> CoreResult<Vec<f64>> {
    let corrupted = |reason: String| CoreError::FlowCacheCorrupted {
        path: origin.to_path_buf(),
        reason,
    };

    let Some((count_bytes, payload)) = bytes.split_first_chunk::<COUNT_BYTES>() else {
        return Err(corrupted(format!(
            "file is {} bytes, shorter than the length header",
            bytes.len()
        )));
    };

    let count = i32::from_le_bytes(*count_bytes);
    if count < 0 {
        return Err(corrupted(format!("negative value count {count}")));
    }

    let count = count as usize;
    let expected = count * VALUE_BYTES;
    if payload.len() < expected {
        return Err(corrupted(format!(
            "header declares {count} values but only {} bytes follow",
            payload.len()
        )));
    }

    Ok(payload[..expected]
        .chunks_exact(VALUE_BYTES)
        .map(|chunk| {
            let mut raw = [0u8; VALUE_BYTES];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}

/// Reads a flow cache file
pub fn read_flow_file(path: &Path) -> CoreResult<Vec<f64>> {
    let bytes = std::fs::read(path)?;
    decode_flow(&bytes, path)
}

/// Writes a flow cache file atomically
pub fn write_flow_file(path: &Path, values: &[f64]) -> CoreResult<()> {
    let bytes = encode_flow(values)?;
    write_atomic(path, &bytes)?;
    info!(
        "[flow] Saved flow signal to {}, length={}",
        path.display(),
        values.len()
    );
    Ok(())
}
