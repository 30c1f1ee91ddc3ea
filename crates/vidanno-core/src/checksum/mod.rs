//! Content Checksums
//!
//! Streams a video file through SHA-256 (default) or MD5 and returns the
//! lowercase hex digest. The digest is the durable identity of a video:
//! annotations follow the content, not the path.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{Checksum, CoreError, CoreResult};

/// Default read block size (64 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 16;

/// Supported digest algorithms
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Md5,
}


enum Hasher {
    Sha256(Sha256),
    Md5(md5::Context),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            ChecksumAlgorithm::Md5 => Self::Md5(md5::Context::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Md5(ctx) => ctx.consume(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Md5(ctx) => format!("{:x}", ctx.compute()),
        }
    }
}

/// Computes content checksums with a fixed algorithm and block size
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecksumStore {
    algorithm: ChecksumAlgorithm,
    block_size: usize,
}

impl Default for ChecksumStore {
    fn default() -> Self {
        Self::new(ChecksumAlgorithm::Sha256, DEFAULT_BLOCK_SIZE)
    }
}

impl ChecksumStore {
    /// Creates a checksum store. A zero block size falls back to the default.
    pub fn new(algorithm: ChecksumAlgorithm, block_size: usize) -> Self {
        let block_size = if block_size == 0 {
            DEFAULT_BLOCK_SIZE
        } else {
            block_size
        };
        Self {
            algorithm,
            block_size,
        }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Computes the hex digest of the file at `path`.
    ///
    /// Any read failure is returned as an error; a partial digest is never
    /// produced.
    pub fn checksum(&self, path: &Path) -> CoreResult<Checksum> {
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(self.block_size, file);
        let mut hasher = Hasher::new(self.algorithm);
        let mut buffer = vec![0u8; self.block_size];

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        let digest = hasher.finalize_hex();
        debug!(
            "[checksum] {:?} of {} = {}",
            self.algorithm,
            path.display(),
            digest
        );
        Ok(digest)
    }

    /// Computes the checksum on a blocking worker thread.
    ///
    /// Hashing a multi-gigabyte video takes seconds; async callers use this
    /// to keep their executor free.
    pub async fn checksum_async(&self, path: PathBuf) -> CoreResult<Checksum> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.checksum(&path))
            .await
            .map_err(|e| CoreError::Internal(format!("Checksum task failed: {}", e)))?
    }
}
