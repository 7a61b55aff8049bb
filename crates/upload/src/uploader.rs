//! Chunked upload entry point.
//!
//! `ChunkedUploader` owns what is shared between uploads to one storage (the
//! config, the resolved endpoints and the receiver client) and starts one
//! [`UploadSession`] per file.

use std::sync::Arc;
use std::time::Duration;

use chunkrelay_receiver::{Client, ReceiverEndpoints};
use chunkrelay_transfer::{
    ChunkSource, derive_upload_id, join_storage_path, sanitize_storage_path,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ChunkedStorageConfig;
use crate::error::UploadError;
use crate::resolver::{StoreProbe, resolve_unique_path};
use crate::session::UploadSession;
use crate::transport::ChunkTransport;
use crate::types::{DEFAULT_BACKOFF_UNIT, SessionOptions, UploadEvent, UploadResult};

/// Uploads files to one chunk receiver.
///
/// Uploads may run concurrently on one uploader; nothing but the transport
/// (and its connection pool) is shared between them.
pub struct ChunkedUploader {
    config: ChunkedStorageConfig,
    endpoints: ReceiverEndpoints,
    transport: Arc<dyn ChunkTransport>,
    probe: Option<Arc<dyn StoreProbe>>,
    events_tx: Option<mpsc::Sender<UploadEvent>>,
    backoff_unit: Duration,
}

impl ChunkedUploader {
    /// Validates `config` and builds an uploader backed by the HTTP receiver
    /// client.
    pub fn new(config: ChunkedStorageConfig) -> Result<Self, UploadError> {
        Self::check_config(&config)?;
        let client = Client::with_timeout(config.timeout())?;
        Self::with_transport(config, Arc::new(client))
    }

    /// Builds an uploader over a custom transport.
    pub fn with_transport(
        config: ChunkedStorageConfig,
        transport: Arc<dyn ChunkTransport>,
    ) -> Result<Self, UploadError> {
        Self::check_config(&config)?;

        let mut endpoints = ReceiverEndpoints::resolve(&config.receiver_url).map_err(|e| {
            UploadError::Config(format!(
                "invalid receiver_url {:?} for storage {:?}: {e}",
                config.receiver_url, config.name
            ))
        })?;
        if !config.resume {
            endpoints = endpoints.without_resume();
        }

        Ok(Self {
            config,
            endpoints,
            transport,
            probe: None,
            events_tx: None,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        })
    }

    fn check_config(config: &ChunkedStorageConfig) -> Result<(), UploadError> {
        config.validate()?;
        if !config.uses_receiver() {
            return Err(UploadError::Config(format!(
                "receiver_url is required for chunked uploads to storage {:?}",
                config.name
            )));
        }
        Ok(())
    }

    /// Checks target names against the store before uploading.
    pub fn with_probe(mut self, probe: Arc<dyn StoreProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Forwards progress events of every upload to `events_tx`.
    pub fn with_events(mut self, events_tx: mpsc::Sender<UploadEvent>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn config(&self) -> &ChunkedStorageConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &ReceiverEndpoints {
        &self.endpoints
    }

    /// Uploads `source` to `relative_path` under the configured base path.
    ///
    /// `content_length` makes the upload id deterministic, which is what lets
    /// a later call with the same path and length resume this one.
    pub async fn upload<S: ChunkSource>(
        &self,
        source: S,
        relative_path: &str,
        content_length: Option<u64>,
        cancel: CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        // Sanitize before joining so `..` cannot climb out of base_path.
        let relative = sanitize_storage_path(relative_path)?;
        let joined = join_storage_path(&self.config.base_path, &relative);

        let unique = match &self.probe {
            Some(probe) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                path = resolve_unique_path(probe.as_ref(), &joined) => path,
            },
            None => joined,
        };

        let storage_path = sanitize_storage_path(&unique)?;
        let upload_id = derive_upload_id(&unique, content_length);

        info!(
            storage = %self.config.name,
            path = %storage_path,
            upload_id = %upload_id,
            content_length = ?content_length,
            "starting chunked upload"
        );

        let options = SessionOptions {
            chunk_size: self.config.chunk_size_bytes(),
            max_retries: self.config.max_retries(),
            backoff_unit: self.backoff_unit,
        };

        let mut session = UploadSession::new(
            self.transport.as_ref(),
            &self.endpoints,
            source,
            storage_path,
            upload_id,
            options,
            cancel,
        );
        if let Some(tx) = &self.events_tx {
            session = session.with_events(tx.clone());
        }
        session.run().await
    }
}
