//! Runs one upload and reports its progress.

use std::path::Path;

use anyhow::{Context, bail};
use chunkrelay_transfer::{ChunkSource, Unseekable};
use chunkrelay_upload::{ChunkedStorageConfig, ChunkedUploader, UploadEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Args;

/// Uploads `args.source` to `storage` until it completes, fails or Ctrl-C
/// cancels it.
pub async fn run(args: Args, storage: ChunkedStorageConfig) -> anyhow::Result<()> {
    let (events_tx, events_rx) = mpsc::channel(64);
    let uploader = ChunkedUploader::new(storage)?.with_events(events_tx);

    let destination = destination_for(&args.source, args.destination.as_deref())?;
    let (source, length) = open_source(&args.source, args.size).await?;

    let cancel = CancellationToken::new();
    let sigint = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("SIGINT received, cancelling upload");
            sigint.cancel();
        }
    });

    let progress = tokio::spawn(log_events(events_rx, length));
    let result = uploader.upload(source, &destination, length, cancel).await;

    // Closes the event channel so the progress task drains and exits.
    drop(uploader);
    let _ = progress.await;

    match result {
        Ok(done) => {
            tracing::info!(
                path = %done.storage_path,
                upload_id = %done.upload_id,
                bytes = done.total_bytes,
                resumed_from = ?done.resumed_from,
                "upload finished"
            );
            Ok(())
        }
        Err(e) if e.is_resumable() && length.is_some() => {
            Err(e).context("upload interrupted; run the same command again to resume")
        }
        Err(e) => Err(e.into()),
    }
}

/// Picks the destination path: the explicit one, or the source file name.
fn destination_for(source: &str, destination: Option<&str>) -> anyhow::Result<String> {
    if let Some(dest) = destination {
        return Ok(dest.to_string());
    }
    if source == "-" {
        bail!("a destination path is required when uploading from stdin");
    }
    Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("cannot derive a destination from {source:?}"))
}

/// Opens the source. Files are seekable and report their length; stdin is
/// forward-only and its length comes from `--size`.
async fn open_source(
    source: &str,
    size: Option<u64>,
) -> anyhow::Result<(Box<dyn ChunkSource>, Option<u64>)> {
    if source == "-" {
        return Ok((Box::new(Unseekable::new(tokio::io::stdin())), size));
    }

    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("failed to open {source}"))?;
    let length = file.metadata().await?.len();
    Ok((Box::new(file), Some(length)))
}

async fn log_events(mut events_rx: mpsc::Receiver<UploadEvent>, total: Option<u64>) {
    while let Some(event) = events_rx.recv().await {
        match event {
            UploadEvent::ChunkSent { offset, size, .. } => {
                let sent = offset + size as u64;
                match total {
                    Some(total) if total > 0 => {
                        tracing::info!(sent, total, percent = sent * 100 / total, "progress");
                    }
                    _ => tracing::info!(sent, "progress"),
                }
            }
            UploadEvent::Retrying { offset, attempt, .. } => {
                tracing::debug!(offset, attempt, "retrying chunk");
            }
            other => tracing::debug!(event = ?other, "upload event"),
        }
    }
}
