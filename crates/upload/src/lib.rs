//! Resumable chunked uploads against a chunk receiver.
//!
//! This crate implements the **protocol engine** of the chunked upload
//! path. It has no opinion about where bytes come from or how the receiver
//! is reached: sources are [`ChunkSource`]s and the receiver sits behind the
//! [`ChunkTransport`] trait, implemented for the HTTP client in
//! `chunkrelay-receiver`.
//!
//! # Pipeline
//!
//! 1. **Resolve**: sanitize the path, join it under the base path, pick a
//!    free name in the target store
//! 2. **Identify**: derive the upload id (deterministic when the length is
//!    known)
//! 3. **Probe**: ask the receiver how many bytes it already holds
//! 4. **Seek or restart**: resume a seekable source, reset a pipe
//! 5. **Send**: post chunks in order, retrying each with linear backoff
//! 6. **Complete**: ask the receiver to finalize the file
//!
//! [`ChunkSource`]: chunkrelay_transfer::ChunkSource

pub mod config;
pub mod error;
pub mod resolver;
pub mod session;
pub mod transport;
pub mod types;
pub mod uploader;

// Re-export primary types for convenience.
pub use config::ChunkedStorageConfig;
pub use error::UploadError;
pub use resolver::{StoreProbe, resolve_unique_path};
pub use session::UploadSession;
pub use transport::{ChunkTransport, TransportFuture};
pub use types::{SessionOptions, SessionState, UploadEvent, UploadResult};
pub use uploader::ChunkedUploader;
