//! Chunk receiver HTTP client.
//!
//! Async HTTP client using `reqwest` with multipart form bodies. One
//! [`Client`] wraps one connection pool and can serve any number of
//! concurrent uploads.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::types::{ConflictResponse, StatusResponse, UploadOutcome};

/// Overall request timeout, sized for very large chunks on slow links.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Errors from the receiver client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("receiver returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("receiver_url is empty")]
    EmptyBaseUrl,
}

/// Chunk receiver client.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    /// Creates a client with the default two-hour timeout.
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom overall request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Wraps an existing `reqwest` client (shared pool).
    pub fn from_http(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Sends one chunk to `POST /upload_chunk` and classifies the response.
    ///
    /// A 409 means the receiver has a different offset on record; it is
    /// reported as [`UploadOutcome::OffsetMismatch`] and must not be treated
    /// as a transient failure.
    pub async fn post_chunk(
        &self,
        url: &str,
        filename: &str,
        upload_id: &str,
        offset: u64,
        data: Vec<u8>,
    ) -> UploadOutcome {
        let size = data.len();
        let part = Part::bytes(data).file_name(base_name(filename).to_string());
        let form = Form::new()
            .text("filename", filename.to_string())
            .text("upload_id", upload_id.to_string())
            .text("offset", offset.to_string())
            .part("file", part);

        let resp = match self.http.post(url).multipart(form).send().await {
            Ok(resp) => resp,
            Err(e) => return UploadOutcome::TransportFailure(e.into()),
        };
        let status = resp.status();
        debug!(upload_id, offset, size, status = status.as_u16(), "chunk posted");

        if status.is_success() {
            return UploadOutcome::Success;
        }

        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            let expected = serde_json::from_str::<ConflictResponse>(&body)
                .ok()
                .and_then(|c| c.expected_offset);
            return UploadOutcome::OffsetMismatch { expected };
        }

        UploadOutcome::ProtocolFailure {
            status: status.as_u16(),
            body,
        }
    }

    /// Signals end of stream via `POST /complete` so the receiver finalizes
    /// the staged file.
    pub async fn post_complete(
        &self,
        url: &str,
        filename: &str,
        upload_id: &str,
    ) -> Result<(), Error> {
        let form = Form::new()
            .text("filename", filename.to_string())
            .text("upload_id", upload_id.to_string());
        let resp = self.http.post(url).multipart(form).send().await?;
        ensure_success(resp).await?;
        debug!(upload_id, filename, "upload completed on receiver");
        Ok(())
    }

    /// Returns the bytes the receiver holds for `upload_id` via `GET /status`.
    ///
    /// An unknown id reports 0.
    pub async fn get_status(&self, url: &str, upload_id: &str) -> Result<u64, Error> {
        let resp = self
            .http
            .get(url)
            .query(&[("upload_id", upload_id)])
            .send()
            .await?;
        let body = ensure_success(resp).await?.bytes().await?;
        let status: StatusResponse = serde_json::from_slice(&body)?;
        debug!(upload_id, size = status.size, "receiver status");
        Ok(status.size)
    }

    /// Discards any partial state for `upload_id` via `POST /reset`.
    pub async fn post_reset(&self, url: &str, upload_id: &str) -> Result<(), Error> {
        let form = Form::new().text("upload_id", upload_id.to_string());
        let resp = self.http.post(url).multipart(form).send().await?;
        ensure_success(resp).await?;
        debug!(upload_id, "receiver state reset");
        Ok(())
    }
}

/// Maps a non-2xx response to [`Error::Api`].
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        body,
    })
}

/// Last segment of a `/`-separated storage path.
fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
