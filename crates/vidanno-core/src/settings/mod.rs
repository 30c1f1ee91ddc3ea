//! Configuration System
//!
//! Provides the application configuration with:
//! - TOML file with per-field defaults
//! - Atomic file writes (temp file + rename)
//! - Normalization of out-of-range values
//!
//! Storage location: {config_dir}/vidanno/config.toml

pub mod reasons;

use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::checksum::{ChecksumAlgorithm, ChecksumStore, DEFAULT_BLOCK_SIZE};
use crate::clips::{ClipLabel, KeyframeGenerator, DEFAULT_FLOW_THRESHOLD};
use crate::fs::write_atomic;
use crate::{CoreError, CoreResult};

pub use reasons::{GroupKind, ReasonCatalog, ReasonGroupTable, ReasonOption, ReasonTable};

/// Application version written into every annotation file
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file name
pub const CONFIG_FILE: &str = "config.toml";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const CONFIG_LOCK_FILE: &str = "config.toml.lock";

/// Directory under the platform config dir
pub const APP_DIR_NAME: &str = "vidanno";

const MIN_BLOCK_SIZE: usize = 4 * 1024;
const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

// =============================================================================
// Config
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub application: ApplicationInfo,

    /// Reasons offered for accepted clips
    #[serde(default = "default_accept_reasons")]
    pub accept_reasons: ReasonTable,

    /// Reasons offered for rejected clips
    #[serde(default = "default_reject_reasons")]
    pub reject_reasons: ReasonTable,

    #[serde(default)]
    pub checksum: ChecksumSettings,

    #[serde(default)]
    pub keyframes: KeyframeSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            application: ApplicationInfo::default(),
            accept_reasons: default_accept_reasons(),
            reject_reasons: default_reject_reasons(),
            checksum: ChecksumSettings::default(),
            keyframes: KeyframeSettings::default(),
        }
    }
}

impl AppConfig {
    /// Normalizes and clamps values so a hand-edited file never yields an
    /// unusable configuration.
    pub fn normalize(&mut self) {
        self.application.version = APP_VERSION.to_string();

        if self.checksum.block_size == 0 {
            self.checksum.block_size = DEFAULT_BLOCK_SIZE;
        }
        self.checksum.block_size = self.checksum.block_size.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE);

        self.keyframes.flow_threshold = if self.keyframes.flow_threshold.is_finite() {
            self.keyframes.flow_threshold.clamp(0.001, 10.0)
        } else {
            DEFAULT_FLOW_THRESHOLD
        };
    }

    pub fn accept_catalog(&self) -> ReasonCatalog {
        ReasonCatalog::from_table(&self.accept_reasons)
    }

    pub fn reject_catalog(&self) -> ReasonCatalog {
        ReasonCatalog::from_table(&self.reject_reasons)
    }

    /// Catalog offered for a label; `None` for the cleared label
    pub fn catalog_for(&self, label: ClipLabel) -> Option<ReasonCatalog> {
        match label {
            ClipLabel::Accept => Some(self.accept_catalog()),
            ClipLabel::Reject => Some(self.reject_catalog()),
            ClipLabel::None => None,
        }
    }

    /// Validates reasons against the catalog of `label` and returns them in
    /// catalog order. Clearing a label always yields no reasons.
    pub fn check_reasons(
        &self,
        label: ClipLabel,
        reasons: &IndexSet<String>,
    ) -> CoreResult<IndexSet<String>> {
        let Some(catalog) = self.catalog_for(label) else {
            return Ok(IndexSet::new());
        };
        catalog.validate(label, reasons)?;
        Ok(catalog.ordered(reasons))
    }

    pub fn checksum_store(&self) -> ChecksumStore {
        ChecksumStore::new(self.checksum.algorithm, self.checksum.block_size)
    }

    pub fn keyframe_generator(&self) -> KeyframeGenerator {
        KeyframeGenerator::new(self.keyframes.flow_threshold)
    }
}

/// Application identity, also written as annotation file metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationInfo {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,

    #[serde(default = "default_author")]
    pub author: String,

    /// Double-check that a stored record carries the checksum it is filed under
    #[serde(default = "default_true")]
    pub enable_hashsum_validation: bool,

    /// Carried in every annotation file header; flow signals are always
    /// loaded lazily on the first keyframe generation
    #[serde(default = "default_false")]
    pub enable_video_preprocessing: bool,
}

impl Default for ApplicationInfo {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
            author: default_author(),
            enable_hashsum_validation: true,
            enable_video_preprocessing: false,
        }
    }
}

fn default_app_name() -> String {
    "Video Annotation Tool".to_string()
}

fn default_app_version() -> String {
    APP_VERSION.to_string()
}

fn default_author() -> String {
    "vidanno Team".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Checksum settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecksumSettings {
    #[serde(default)]
    pub algorithm: ChecksumAlgorithm,

    /// Read block size in bytes
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

impl Default for ChecksumSettings {
    fn default() -> Self {
        Self {
            algorithm: ChecksumAlgorithm::default(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

/// Keyframe generation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyframeSettings {
    /// Accumulated motion that must be exceeded before the next keyframe
    #[serde(default = "default_flow_threshold")]
    pub flow_threshold: f64,
}

impl Default for KeyframeSettings {
    fn default() -> Self {
        Self {
            flow_threshold: DEFAULT_FLOW_THRESHOLD,
        }
    }
}

fn default_flow_threshold() -> f64 {
    DEFAULT_FLOW_THRESHOLD
}

fn reason_table(simple: &[&str], groups: &[(&str, &[&str])]) -> ReasonTable {
    ReasonTable {
        simple: simple.iter().map(|s| s.to_string()).collect(),
        groups: groups
            .iter()
            .map(|(name, options)| {
                (
                    name.to_string(),
                    ReasonGroupTable {
                        name: name.to_string(),
                        kind: GroupKind::CheckBox,
                        options: options.iter().map(|s| s.to_string()).collect(),
                    },
                )
            })
            .collect::<IndexMap<_, _>>(),
    }
}

fn default_accept_reasons() -> ReasonTable {
    reason_table(&["1", "2", "3", "4"], &[("3", &["3.1", "3.2", "3.3"])])
}

fn default_reject_reasons() -> ReasonTable {
    reason_table(&["1", "2"], &[("1", &["1.1", "1.2"])])
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Loads and saves the configuration file
pub struct SettingsManager {
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a manager for the config file at `config_path`
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Creates a manager for the platform default location
    pub fn with_default_path() -> CoreResult<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            CoreError::Internal("Could not determine the platform config directory".to_string())
        })?;
        Ok(Self::new(dir.join(APP_DIR_NAME).join(CONFIG_FILE)))
    }

    /// Get the config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn lock_path(&self) -> PathBuf {
        self.config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CONFIG_LOCK_FILE)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file)?;
        } else {
            fs2::FileExt::lock_shared(&lock_file)?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock config lock file: {}", e);
        }

        result
    }

    /// Loads the configuration.
    ///
    /// A missing file is created with defaults. An unreadable or invalid file
    /// is reported and defaults are used.
    pub fn load(&self) -> AppConfig {
        if !self.config_path.exists() {
            return match self.save(&AppConfig::default()) {
                Ok(config) => {
                    info!(
                        "[config] Created default configuration at {}",
                        self.config_path.display()
                    );
                    config
                }
                Err(e) => {
                    warn!("[config] Failed to write default configuration: {}", e);
                    let mut config = AppConfig::default();
                    config.normalize();
                    config
                }
            };
        }

        let result = self.with_lock(false, || {
            let content = fs::read_to_string(&self.config_path)?;
            let mut config = toml::from_str::<AppConfig>(&content)?;
            config.normalize();
            Ok(config)
        });

        match result {
            Ok(config) => {
                info!(
                    "[config] Loaded configuration from {}",
                    self.config_path.display()
                );
                config
            }
            Err(e) => {
                warn!("[config] Failed to load configuration, using defaults: {}", e);
                let mut config = AppConfig::default();
                config.normalize();
                config
            }
        }
    }

    /// Saves the configuration using an atomic write
    pub fn save(&self, config: &AppConfig) -> CoreResult<AppConfig> {
        self.with_lock(true, || {
            let mut normalized = config.clone();
            normalized.normalize();

            let content = toml::to_string_pretty(&normalized)?;
            write_atomic(&self.config_path, content.as_bytes())?;

            info!("[config] Configuration saved to {}", self.config_path.display());
            Ok(normalized)
        })
    }
}
