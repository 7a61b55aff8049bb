//! Data types for the upload flow.

use std::time::Duration;

use chunkrelay_transfer::DEFAULT_CHUNK_SIZE;

/// Default number of attempts per chunk.
pub const DEFAULT_CHUNK_RETRIES: u32 = 3;

/// Default backoff unit: attempt `n` waits `n` units before the next try.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Per-session tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Chunk size in bytes.
    pub chunk_size: usize,
    /// Attempts per chunk before the upload fails (at least 1).
    pub max_retries: u32,
    /// Linear backoff unit between attempts.
    pub backoff_unit: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_CHUNK_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

/// States of an [`UploadSession`](crate::UploadSession).
///
/// ```text
/// Init -> ProbeStatus -> Seeking | Restarting -> SendingChunks -> Completing -> Done
/// ```
///
/// Any non-terminal state can move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    ProbeStatus,
    /// Receiver holds `offset` bytes and the source can seek to them.
    Seeking { offset: u64 },
    /// Receiver holds `discarded` bytes the source cannot replay.
    Restarting { discarded: u64 },
    SendingChunks,
    Completing,
    Done,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

/// Progress event emitted during an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Continuing a previous attempt from the receiver's offset.
    Resumed { upload_id: String, offset: u64 },
    /// Receiver state was discarded; sending from offset 0.
    Restarted { upload_id: String, discarded: u64 },
    /// A chunk was accepted by the receiver.
    ChunkSent {
        upload_id: String,
        offset: u64,
        size: usize,
    },
    /// A chunk attempt failed and will be retried.
    Retrying {
        upload_id: String,
        offset: u64,
        attempt: u32,
        error: String,
    },
    /// The receiver finalized the file.
    Completed { upload_id: String, bytes: u64 },
    /// The upload stopped with an error.
    Failed { upload_id: String, error: String },
}

/// Result of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Final sanitized path on the receiver.
    pub storage_path: String,
    pub upload_id: String,
    /// Total bytes the receiver holds, including resumed bytes.
    pub total_bytes: u64,
    /// Offset the upload resumed from, if it did.
    pub resumed_from: Option<u64>,
}
