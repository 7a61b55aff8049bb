//! Chunk transport trait.
//!
//! `ChunkTransport` is the seam between the upload session and the wire. The
//! HTTP receiver client implements it; tests use in-memory receivers.

use std::future::Future;
use std::pin::Pin;

use chunkrelay_receiver::{Client, Error as ReceiverError, UploadOutcome};

/// Boxed future returned by transport and probe methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The four receiver exchanges, one request each.
///
/// Implementations perform no retries: retry and backoff belong to the
/// session.
pub trait ChunkTransport: Send + Sync {
    /// Posts one chunk and classifies the response.
    fn post_chunk<'a>(
        &'a self,
        url: &'a str,
        filename: &'a str,
        upload_id: &'a str,
        offset: u64,
        data: Vec<u8>,
    ) -> TransportFuture<'a, UploadOutcome>;

    /// Asks the receiver to finalize the upload.
    fn post_complete<'a>(
        &'a self,
        url: &'a str,
        filename: &'a str,
        upload_id: &'a str,
    ) -> TransportFuture<'a, Result<(), ReceiverError>>;

    /// Returns the bytes the receiver holds for `upload_id`.
    fn get_status<'a>(
        &'a self,
        url: &'a str,
        upload_id: &'a str,
    ) -> TransportFuture<'a, Result<u64, ReceiverError>>;

    /// Discards receiver state for `upload_id`.
    fn post_reset<'a>(
        &'a self,
        url: &'a str,
        upload_id: &'a str,
    ) -> TransportFuture<'a, Result<(), ReceiverError>>;
}

impl ChunkTransport for Client {
    fn post_chunk<'a>(
        &'a self,
        url: &'a str,
        filename: &'a str,
        upload_id: &'a str,
        offset: u64,
        data: Vec<u8>,
    ) -> TransportFuture<'a, UploadOutcome> {
        Box::pin(Client::post_chunk(self, url, filename, upload_id, offset, data))
    }

    fn post_complete<'a>(
        &'a self,
        url: &'a str,
        filename: &'a str,
        upload_id: &'a str,
    ) -> TransportFuture<'a, Result<(), ReceiverError>> {
        Box::pin(Client::post_complete(self, url, filename, upload_id))
    }

    fn get_status<'a>(
        &'a self,
        url: &'a str,
        upload_id: &'a str,
    ) -> TransportFuture<'a, Result<u64, ReceiverError>> {
        Box::pin(Client::get_status(self, url, upload_id))
    }

    fn post_reset<'a>(
        &'a self,
        url: &'a str,
        upload_id: &'a str,
    ) -> TransportFuture<'a, Result<(), ReceiverError>> {
        Box::pin(Client::post_reset(self, url, upload_id))
    }
}
