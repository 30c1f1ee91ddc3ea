//! vidanno Error Definitions
//!
//! Defines error types used throughout the annotation core.

use std::path::PathBuf;

use thiserror::Error;

use super::FrameIndex;

/// Core annotation error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Partition Errors
    // =========================================================================
    #[error("Invalid frame count: {0} (a video needs at least one frame)")]
    InvalidFrameCount(FrameIndex),

    #[error(
        "Flow signal too short for clip [{start_frame},{end_frame}): needs {needed} values, has {available}"
    )]
    FlowSignalTooShort {
        start_frame: FrameIndex,
        end_frame: FrameIndex,
        needed: usize,
        available: usize,
    },

    // =========================================================================
    // Label Errors
    // =========================================================================
    #[error("Unknown {label} reason: {reason}")]
    UnknownReason { label: String, reason: String },

    #[error("Conflicting reasons in single-choice group '{group}': {first} and {second}")]
    ConflictingReasons {
        group: String,
        first: String,
        second: String,
    },

    // =========================================================================
    // Annotation File Errors
    // =========================================================================
    #[error("Unsupported annotation schema: {0}")]
    UnsupportedSchema(String),

    #[error("Malformed annotation record '{key}': {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("No annotation file selected")]
    NoAnnotationFile,

    // =========================================================================
    // Flow Cache Errors
    // =========================================================================
    #[error("Flow cache corrupted: {path}: {reason}")]
    FlowCacheCorrupted { path: PathBuf, reason: String },

    // =========================================================================
    // Session Errors
    // =========================================================================
    #[error("No video open")]
    NoVideoOpen,

    #[error("Video index {index} out of range (playlist has {len} videos)")]
    VideoIndexOutOfRange { index: usize, len: usize },

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    ConfigWriteError(#[from] toml::ser::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Returns true for errors caused by the filesystem rather than by content
    pub fn is_io(&self) -> bool {
        matches!(self, CoreError::IoError(_))
    }
}
