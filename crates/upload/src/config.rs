//! Chunked storage configuration.
//!
//! One `ChunkedStorageConfig` describes one storage target. The native
//! fields (`url`, `username`, `password`) belong to the non-chunked path and
//! are only validated here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::types::DEFAULT_CHUNK_RETRIES;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Largest accepted chunk size. Each chunk is buffered in memory whole.
pub const MAX_CHUNK_SIZE_MB: u32 = 1024;

/// Storage target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedStorageConfig {
    /// Display name of the storage.
    #[serde(default)]
    pub name: String,

    /// Root under which every relative storage path is placed.
    #[serde(default)]
    pub base_path: String,

    /// Receiver base URL. Required for chunked uploads.
    #[serde(default)]
    pub receiver_url: String,

    /// Chunk size in MiB (0 = default).
    #[serde(default = "default_chunk_size_mb")]
    pub chunk_size_mb: u32,

    /// Attempts per chunk (0 = default).
    #[serde(default = "default_chunk_retries")]
    pub chunk_retries: u32,

    /// Native store endpoint.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Overall request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Query the receiver for stored bytes before sending.
    #[serde(default = "default_true")]
    pub resume: bool,
}

fn default_chunk_size_mb() -> u32 {
    10
}

fn default_chunk_retries() -> u32 {
    DEFAULT_CHUNK_RETRIES
}

fn default_timeout_secs() -> u64 {
    2 * 60 * 60
}

fn default_true() -> bool {
    true
}

impl Default for ChunkedStorageConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_path: String::new(),
            receiver_url: String::new(),
            chunk_size_mb: default_chunk_size_mb(),
            chunk_retries: default_chunk_retries(),
            url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
            resume: default_true(),
        }
    }
}

impl ChunkedStorageConfig {
    /// Checks the storage section as a whole.
    ///
    /// `base_path` is always required. Without a `receiver_url` the storage
    /// falls back to the native path, which needs `url`, `username` and
    /// `password`.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.base_path.trim().is_empty() {
            return Err(UploadError::Config(format!(
                "base_path is required for storage {:?}",
                self.name
            )));
        }
        if self.chunk_size_mb > MAX_CHUNK_SIZE_MB {
            return Err(UploadError::Config(format!(
                "chunk_size_mb {} exceeds the {MAX_CHUNK_SIZE_MB} MiB limit for storage {:?}",
                self.chunk_size_mb, self.name
            )));
        }
        if self.receiver_url.trim().is_empty() {
            if self.url.trim().is_empty() {
                return Err(UploadError::Config(format!(
                    "url is required for storage {:?}",
                    self.name
                )));
            }
            if self.username.is_empty() || self.password.is_empty() {
                return Err(UploadError::Config(format!(
                    "username and password are required for storage {:?}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Whether uploads to this storage go through the chunk receiver.
    pub fn uses_receiver(&self) -> bool {
        !self.receiver_url.trim().is_empty()
    }

    /// Effective chunk size in bytes.
    pub fn chunk_size_bytes(&self) -> usize {
        let mb = if self.chunk_size_mb == 0 {
            default_chunk_size_mb()
        } else {
            self.chunk_size_mb
        };
        mb as usize * BYTES_PER_MB
    }

    /// Effective attempts per chunk.
    pub fn max_retries(&self) -> u32 {
        if self.chunk_retries == 0 {
            DEFAULT_CHUNK_RETRIES
        } else {
            self.chunk_retries
        }
    }

    pub fn timeout(&self) -> Duration {
        let secs = if self.timeout_secs == 0 {
            default_timeout_secs()
        } else {
            self.timeout_secs
        };
        Duration::from_secs(secs)
    }
}
