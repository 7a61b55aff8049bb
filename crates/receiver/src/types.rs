//! Receiver response types.

use serde::{Deserialize, Serialize};

use crate::client::Error;

/// Body of `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub upload_id: String,
    /// Bytes durably stored for the upload id (0 if unknown).
    #[serde(default)]
    pub size: u64,
}

/// Body of a `409 Conflict` from `POST /upload_chunk` (internal).
#[derive(Debug, Deserialize)]
pub(crate) struct ConflictResponse {
    #[serde(default)]
    pub expected_offset: Option<u64>,
}

/// Classified result of posting one chunk.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The receiver stored the chunk (2xx).
    Success,
    /// The receiver's recorded offset disagrees with ours (409).
    ///
    /// `expected` is the receiver's offset when the response carried one.
    OffsetMismatch { expected: Option<u64> },
    /// No response: connection, TLS, timeout or body encoding failure.
    TransportFailure(Error),
    /// Any other non-success status.
    ProtocolFailure { status: u16, body: String },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success)
    }
}
