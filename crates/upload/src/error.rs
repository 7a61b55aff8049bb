//! Upload error types.

use chunkrelay_receiver::Error as ReceiverError;
use chunkrelay_transfer::TransferError;

/// Errors produced by a chunked upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid storage path: {0}")]
    Path(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read upload source: {0}")]
    SourceRead(#[source] std::io::Error),

    #[error(
        "offset mismatch for chunk at offset {offset} of upload {upload_id}{}",
        expected_hint(.expected)
    )]
    OffsetMismatch {
        offset: u64,
        expected: Option<u64>,
        upload_id: String,
    },

    #[error("failed to upload chunk at offset {offset} of upload {upload_id} after {attempts} attempts: {source}")]
    Chunk {
        offset: u64,
        attempts: u32,
        upload_id: String,
        #[source]
        source: ReceiverError,
    },

    #[error("failed to complete upload {upload_id}: {source}")]
    Completion {
        upload_id: String,
        #[source]
        source: ReceiverError,
    },

    #[error("receiver client error: {0}")]
    Receiver(#[from] ReceiverError),

    #[error("cancelled")]
    Cancelled,
}

impl UploadError {
    /// Returns true if a later attempt with the same upload id can pick up
    /// where this one stopped.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            UploadError::Chunk { .. } | UploadError::Completion { .. } | UploadError::Cancelled
        )
    }

    /// Byte offset the failure happened at, if it is tied to a chunk.
    pub fn offset(&self) -> Option<u64> {
        match self {
            UploadError::OffsetMismatch { offset, .. } | UploadError::Chunk { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

impl From<TransferError> for UploadError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Io(e) => UploadError::SourceRead(e),
            TransferError::InvalidPath(p) => UploadError::Path(p),
            TransferError::Cancelled => UploadError::Cancelled,
        }
    }
}

fn expected_hint(expected: &Option<u64>) -> String {
    match expected {
        Some(offset) => format!(" (receiver expects offset {offset})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_mismatch_message_names_offset() {
        let err = UploadError::OffsetMismatch {
            offset: 10_485_760,
            expected: Some(0),
            upload_id: "abc".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10485760"), "{msg}");
        assert!(msg.contains("receiver expects offset 0"), "{msg}");
        assert!(msg.contains("abc"), "{msg}");
        assert_eq!(err.offset(), Some(10_485_760));
        assert!(!err.is_resumable());
    }

    #[test]
    fn offset_mismatch_without_expected() {
        let err = UploadError::OffsetMismatch {
            offset: 5,
            expected: None,
            upload_id: "abc".into(),
        };
        assert!(!err.to_string().contains("expects"));
    }

    #[test]
    fn chunk_error_wraps_receiver_error() {
        let err = UploadError::Chunk {
            offset: 42,
            attempts: 3,
            upload_id: "abc".into(),
            source: ReceiverError::Api {
                status: 502,
                body: "bad gateway".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("offset 42"), "{msg}");
        assert!(msg.contains("3 attempts"), "{msg}");
        assert!(msg.contains("502"), "{msg}");
        assert!(err.is_resumable());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn transfer_errors_map_to_kinds() {
        let path: UploadError = TransferError::InvalidPath("../x".into()).into();
        assert!(matches!(path, UploadError::Path(_)));

        let io: UploadError = TransferError::Io(std::io::Error::other("disk")).into();
        assert!(matches!(io, UploadError::SourceRead(_)));

        let cancelled: UploadError = TransferError::Cancelled.into();
        assert!(matches!(cancelled, UploadError::Cancelled));
    }
}
