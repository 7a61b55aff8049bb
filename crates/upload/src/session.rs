//! Upload session: one file, one receiver, one upload id.
//!
//! The session is an explicit state machine (see [`SessionState`]). Each
//! state is handled by one transition function that returns the next state,
//! so the resume decision, the retry loop and the completion step can be
//! driven and checked one at a time.

use std::future::Future;

use chunkrelay_receiver::{Error as ReceiverError, ReceiverEndpoints, UploadOutcome};
use chunkrelay_transfer::{Chunk, ChunkReader, ChunkSource, sanitize_storage_path};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::transport::ChunkTransport;
use crate::types::{SessionOptions, SessionState, UploadEvent, UploadResult};

/// Drives one chunked upload from status probe to completion.
///
/// Chunks are sent strictly in offset order; `sent_bytes` only grows and is
/// always the offset of the next chunk.
pub struct UploadSession<'a, S> {
    link: Link<'a>,
    reader: ChunkReader<S>,
    sent_bytes: u64,
    resumed_from: Option<u64>,
    state: SessionState,
}

/// Everything a session needs to talk to the receiver. Kept apart from the
/// source so it can be borrowed while the reader is mutably borrowed.
struct Link<'a> {
    transport: &'a dyn ChunkTransport,
    endpoints: &'a ReceiverEndpoints,
    storage_path: String,
    upload_id: String,
    options: SessionOptions,
    cancel: CancellationToken,
    events_tx: Option<mpsc::Sender<UploadEvent>>,
}

impl<'a, S: ChunkSource> UploadSession<'a, S> {
    /// Creates a session in the `Init` state.
    pub fn new(
        transport: &'a dyn ChunkTransport,
        endpoints: &'a ReceiverEndpoints,
        source: S,
        storage_path: impl Into<String>,
        upload_id: impl Into<String>,
        options: SessionOptions,
        cancel: CancellationToken,
    ) -> Self {
        let reader = ChunkReader::new(source, options.chunk_size);
        Self {
            link: Link {
                transport,
                endpoints,
                storage_path: storage_path.into(),
                upload_id: upload_id.into(),
                options,
                cancel,
                events_tx: None,
            },
            reader,
            sent_bytes: 0,
            resumed_from: None,
            state: SessionState::Init,
        }
    }

    /// Sends progress events to `events_tx`.
    pub fn with_events(mut self, events_tx: mpsc::Sender<UploadEvent>) -> Self {
        self.link.events_tx = Some(events_tx);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bytes acknowledged by the receiver so far.
    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes
    }

    pub fn upload_id(&self) -> &str {
        &self.link.upload_id
    }

    /// Runs the session until it is done or fails.
    pub async fn run(mut self) -> Result<UploadResult, UploadError> {
        while !self.state.is_terminal() {
            match self.step().await {
                Ok(next) => self.transition(next),
                Err(e) => {
                    self.transition(SessionState::Failed);
                    error!(
                        upload_id = %self.link.upload_id,
                        path = %self.link.storage_path,
                        sent_bytes = self.sent_bytes,
                        error = %e,
                        "upload failed"
                    );
                    self.link
                        .emit(UploadEvent::Failed {
                            upload_id: self.link.upload_id.clone(),
                            error: e.to_string(),
                        })
                        .await;
                    return Err(e);
                }
            }
        }

        self.link
            .emit(UploadEvent::Completed {
                upload_id: self.link.upload_id.clone(),
                bytes: self.sent_bytes,
            })
            .await;

        Ok(UploadResult {
            storage_path: self.link.storage_path,
            upload_id: self.link.upload_id,
            total_bytes: self.sent_bytes,
            resumed_from: self.resumed_from,
        })
    }

    /// Handles the current state and returns the next one.
    async fn step(&mut self) -> Result<SessionState, UploadError> {
        self.link.check_cancelled()?;
        match self.state {
            SessionState::Init => self.init(),
            SessionState::ProbeStatus => self.probe_status().await,
            SessionState::Seeking { offset } => self.seek(offset).await,
            SessionState::Restarting { discarded } => self.restart(discarded).await,
            SessionState::SendingChunks => self.send_next_chunk().await,
            SessionState::Completing => self.complete().await,
            terminal @ (SessionState::Done | SessionState::Failed) => Ok(terminal),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next != self.state {
            debug!(
                upload_id = %self.link.upload_id,
                from = ?self.state,
                to = ?next,
                "session transition"
            );
        }
        self.state = next;
    }

    fn init(&mut self) -> Result<SessionState, UploadError> {
        // Callers sanitize already; the path reaches the receiver from here on.
        self.link.storage_path = sanitize_storage_path(&self.link.storage_path)?;

        if self.link.endpoints.status_url.is_some() {
            Ok(SessionState::ProbeStatus)
        } else {
            Ok(SessionState::SendingChunks)
        }
    }

    /// Decides between resume, restart and a fresh upload.
    async fn probe_status(&mut self) -> Result<SessionState, UploadError> {
        let Some(url) = self.link.endpoints.status_url.as_deref() else {
            return Ok(SessionState::SendingChunks);
        };

        let status = self
            .link
            .cancellable(self.link.transport.get_status(url, &self.link.upload_id))
            .await?;

        match status {
            Ok(0) => {
                debug!(upload_id = %self.link.upload_id, "no stored bytes on receiver");
                Ok(SessionState::SendingChunks)
            }
            Ok(size) if self.reader.is_seekable() => Ok(SessionState::Seeking { offset: size }),
            Ok(size) => Ok(SessionState::Restarting { discarded: size }),
            Err(e) => {
                warn!(
                    upload_id = %self.link.upload_id,
                    error = %e,
                    "status query failed; uploading from offset 0"
                );
                Ok(SessionState::SendingChunks)
            }
        }
    }

    async fn seek(&mut self, offset: u64) -> Result<SessionState, UploadError> {
        self.reader.seek_to(offset).await?;
        self.sent_bytes = offset;
        self.resumed_from = Some(offset);

        info!(
            upload_id = %self.link.upload_id,
            path = %self.link.storage_path,
            offset,
            "resuming upload"
        );
        self.link
            .emit(UploadEvent::Resumed {
                upload_id: self.link.upload_id.clone(),
                offset,
            })
            .await;
        Ok(SessionState::SendingChunks)
    }

    /// The source cannot replay stored bytes: discard them and start over.
    async fn restart(&mut self, discarded: u64) -> Result<SessionState, UploadError> {
        if let Some(url) = self.link.endpoints.reset_url.as_deref() {
            let reset = self
                .link
                .cancellable(self.link.transport.post_reset(url, &self.link.upload_id))
                .await?;
            if let Err(e) = reset {
                warn!(upload_id = %self.link.upload_id, error = %e, "receiver reset failed");
            }
        }

        warn!(
            upload_id = %self.link.upload_id,
            path = %self.link.storage_path,
            discarded,
            "upload source is not seekable; restarting upload"
        );
        self.link
            .emit(UploadEvent::Restarted {
                upload_id: self.link.upload_id.clone(),
                discarded,
            })
            .await;
        Ok(SessionState::SendingChunks)
    }

    async fn send_next_chunk(&mut self) -> Result<SessionState, UploadError> {
        let Some(chunk) = self.reader.next_chunk(&self.link.cancel).await? else {
            return Ok(SessionState::Completing);
        };
        debug_assert_eq!(chunk.offset, self.sent_bytes);

        self.link.send_chunk(&chunk).await?;
        self.sent_bytes = chunk.end();

        self.link
            .emit(UploadEvent::ChunkSent {
                upload_id: self.link.upload_id.clone(),
                offset: chunk.offset,
                size: chunk.len(),
            })
            .await;
        Ok(SessionState::SendingChunks)
    }

    /// Finalizes the upload. Not retried: a half-finalized upload is not
    /// safe to finalize twice.
    async fn complete(&mut self) -> Result<SessionState, UploadError> {
        let link = &self.link;
        link.cancellable(link.transport.post_complete(
            &link.endpoints.complete_url,
            &link.storage_path,
            &link.upload_id,
        ))
        .await?
        .map_err(|source| UploadError::Completion {
            upload_id: link.upload_id.clone(),
            source,
        })?;

        info!(
            upload_id = %link.upload_id,
            path = %link.storage_path,
            bytes = self.sent_bytes,
            "upload complete"
        );
        Ok(SessionState::Done)
    }
}

impl Link<'_> {
    /// Posts `chunk`, retrying transient failures with linear backoff.
    ///
    /// An offset mismatch fails immediately.
    async fn send_chunk(&self, chunk: &Chunk) -> Result<(), UploadError> {
        let max_attempts = self.options.max_retries.max(1);
        let mut attempt = 1;

        loop {
            self.check_cancelled()?;

            let outcome = self
                .cancellable(self.transport.post_chunk(
                    &self.endpoints.chunk_url,
                    &self.storage_path,
                    &self.upload_id,
                    chunk.offset,
                    chunk.data.clone(),
                ))
                .await?;

            let error = match outcome {
                UploadOutcome::Success => return Ok(()),
                UploadOutcome::OffsetMismatch { expected } => {
                    return Err(UploadError::OffsetMismatch {
                        offset: chunk.offset,
                        expected,
                        upload_id: self.upload_id.clone(),
                    });
                }
                UploadOutcome::TransportFailure(e) => e,
                UploadOutcome::ProtocolFailure { status, body } => {
                    ReceiverError::Api { status, body }
                }
            };

            warn!(
                upload_id = %self.upload_id,
                offset = chunk.offset,
                attempt,
                max_attempts,
                error = %error,
                "chunk upload failed"
            );

            if attempt >= max_attempts {
                return Err(UploadError::Chunk {
                    offset: chunk.offset,
                    attempts: attempt,
                    upload_id: self.upload_id.clone(),
                    source: error,
                });
            }

            self.emit(UploadEvent::Retrying {
                upload_id: self.upload_id.clone(),
                offset: chunk.offset,
                attempt,
                error: error.to_string(),
            })
            .await;
            self.backoff(attempt).await?;
            attempt += 1;
        }
    }

    /// Waits `attempt` backoff units, or until cancelled.
    async fn backoff(&self, attempt: u32) -> Result<(), UploadError> {
        let delay = self.options.backoff_unit * attempt;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Races `fut` against the cancellation token. Dropping the future
    /// aborts an in-flight request.
    async fn cancellable<F: Future>(&self, fut: F) -> Result<F::Output, UploadError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            out = fut => Ok(out),
        }
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn emit(&self, event: UploadEvent) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(event).await;
        }
    }
}
