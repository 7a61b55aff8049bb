//! Chunk sources, storage path sanitization and upload identity.
//!
//! The leaf pieces of the chunked upload client. Nothing in this crate talks
//! to the network: it turns a byte source into fixed-size [`Chunk`]s, keeps
//! caller-supplied paths inside the storage root, and derives the upload id
//! the receiver uses to correlate chunks across attempts.

mod chunked;
mod identity;
mod source;
mod types;
mod validation;

pub use chunked::ChunkReader;
pub use identity::derive_upload_id;
pub use source::{ChunkSource, SeekSource, Seekable, Unseekable};
pub use types::Chunk;
pub use validation::{join_storage_path, sanitize_storage_path};

/// Default chunk size: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("cancelled")]
    Cancelled,
}
