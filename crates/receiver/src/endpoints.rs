//! Receiver URL resolution.

use crate::client::Error;

pub const CHUNK_PATH: &str = "/upload_chunk";
pub const COMPLETE_PATH: &str = "/complete";
pub const STATUS_PATH: &str = "/status";
pub const RESET_PATH: &str = "/reset";

/// The four receiver URLs, derived from one configured base URL.
///
/// `status_url` and `reset_url` are optional: without them an upload never
/// resumes and never discards receiver state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverEndpoints {
    pub chunk_url: String,
    pub complete_url: String,
    pub status_url: Option<String>,
    pub reset_url: Option<String>,
}

impl ReceiverEndpoints {
    /// Resolves the endpoints from `base`.
    ///
    /// A base that already points at the chunk endpoint
    /// (`https://host/recv/upload_chunk`) is trimmed back to the service root
    /// before the paths are re-derived.
    pub fn resolve(base: &str) -> Result<Self, Error> {
        let mut root = base.trim().trim_end_matches('/');
        if let Some(stripped) = root.strip_suffix(CHUNK_PATH) {
            root = stripped.trim_end_matches('/');
        }
        if root.is_empty() {
            return Err(Error::EmptyBaseUrl);
        }

        Ok(Self {
            chunk_url: format!("{root}{CHUNK_PATH}"),
            complete_url: format!("{root}{COMPLETE_PATH}"),
            status_url: Some(format!("{root}{STATUS_PATH}")),
            reset_url: Some(format!("{root}{RESET_PATH}")),
        })
    }

    /// Drops the status and reset endpoints, disabling resume.
    pub fn without_resume(mut self) -> Self {
        self.status_url = None;
        self.reset_url = None;
        self
    }

    pub fn supports_resume(&self) -> bool {
        self.status_url.is_some()
    }
}
