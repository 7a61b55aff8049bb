use std::io::{self, SeekFrom};

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use crate::source::ChunkSource;
use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a [`ChunkSource`] in fixed-size chunks, tracking the byte offset.
///
/// Every chunk except the last is exactly `chunk_size` bytes: short reads
/// from the underlying source are accumulated until the buffer is full or
/// the stream ends.
pub struct ChunkReader<S> {
    source: S,
    chunk_size: usize,
    offset: u64,
}

impl<S: ChunkSource> ChunkReader<S> {
    /// Wraps `source` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (10 MiB) is used.
    pub fn new(source: S, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            source,
            chunk_size,
            offset: 0,
        }
    }

    /// Whether the underlying source can seek (and therefore resume).
    pub fn is_seekable(&mut self) -> bool {
        self.source.seekable().is_some()
    }

    /// Seeks to the given byte offset (for resume).
    pub async fn seek_to(&mut self, offset: u64) -> Result<(), TransferError> {
        let Some(seeker) = self.source.seekable() else {
            return Err(TransferError::Io(io::Error::new(
                io::ErrorKind::Unsupported,
                "upload source is not seekable",
            )));
        };
        seeker.seek(SeekFrom::Start(offset)).await?;
        self.offset = offset;
        Ok(())
    }

    /// Reads the next chunk. Returns `None` at end of stream.
    ///
    /// Each read from the source races `cancel`; a cancelled read discards
    /// the partially filled chunk.
    pub async fn next_chunk(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Chunk>, TransferError> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;

        while filled < buf.len() {
            let n = tokio::select! {
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                read = self.source.read(&mut buf[filled..]) => read?,
            };
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);

        let chunk = Chunk {
            offset: self.offset,
            data: buf,
        };
        self.offset = chunk.end();
        Ok(Some(chunk))
    }

    /// Offset of the next chunk to be read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Unseekable;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    /// Reader that hands out at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let end = (self.pos + self.step)
                .min(self.data.len())
                .min(self.pos + buf.remaining());
            let pos = self.pos;
            buf.put_slice(&self.data[pos..end]);
            self.pos = end;
            Poll::Ready(Ok(()))
        }
    }

    impl ChunkSource for Trickle {}

    /// Reader that always fails.
    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
        }
    }

    impl ChunkSource for Broken {}

    #[tokio::test]
    async fn reads_all_chunks() {
        let cancel = CancellationToken::new();
        let mut reader = ChunkReader::new(Cursor::new(b"AABBCCDDEE".to_vec()), 4);

        let c1 = reader.next_chunk(&cancel).await.unwrap().unwrap();
        assert_eq!(c1.offset, 0);
        assert_eq!(c1.data, b"AABB");

        let c2 = reader.next_chunk(&cancel).await.unwrap().unwrap();
        assert_eq!(c2.offset, 4);
        assert_eq!(c2.data, b"CCDD");

        let c3 = reader.next_chunk(&cancel).await.unwrap().unwrap();
        assert_eq!(c3.offset, 8);
        assert_eq!(c3.data, b"EE");

        assert!(reader.next_chunk(&cancel).await.unwrap().is_none());
        assert_eq!(reader.offset(), 10);
    }

    #[tokio::test]
    async fn short_reads_fill_whole_chunks() {
        let cancel = CancellationToken::new();
        let source = Trickle {
            data: (0u8..20).collect(),
            pos: 0,
            step: 3,
        };
        let mut reader = ChunkReader::new(source, 8);

        let sizes: Vec<usize> = {
            let mut sizes = Vec::new();
            while let Some(chunk) = reader.next_chunk(&cancel).await.unwrap() {
                sizes.push(chunk.len());
            }
            sizes
        };
        assert_eq!(sizes, vec![8, 8, 4]);
    }

    #[tokio::test]
    async fn seek_and_resume() {
        let cancel = CancellationToken::new();
        let mut reader = ChunkReader::new(Cursor::new(b"0123456789".to_vec()), 4);
        assert!(reader.is_seekable());

        reader.seek_to(6).await.unwrap();
        assert_eq!(reader.offset(), 6);

        let c = reader.next_chunk(&cancel).await.unwrap().unwrap();
        assert_eq!(c.offset, 6);
        assert_eq!(c.data, b"6789");
        assert!(reader.next_chunk(&cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seek_on_pipe_fails() {
        let mut reader = ChunkReader::new(Unseekable::new(Cursor::new(b"abc".to_vec())), 4);
        assert!(!reader.is_seekable());

        let err = reader.seek_to(1).await.unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));
        assert_eq!(reader.offset(), 0);
    }

    #[tokio::test]
    async fn default_chunk_size() {
        let reader = ChunkReader::new(Cursor::new(Vec::<u8>::new()), 0);
        assert_eq!(reader.chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn empty_source_has_no_chunks() {
        let cancel = CancellationToken::new();
        let mut reader = ChunkReader::new(Cursor::new(Vec::<u8>::new()), 4);
        assert!(reader.next_chunk(&cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_error_is_io() {
        let cancel = CancellationToken::new();
        let mut reader = ChunkReader::new(Broken, 4);
        let err = reader.next_chunk(&cancel).await.unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));
    }

    #[tokio::test]
    async fn cancelled_read() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        // A pipe that never yields data: only the token can end the read.
        let (_writer, pipe) = tokio::io::duplex(64);
        let mut reader = ChunkReader::new(Unseekable::new(pipe), 4);
        let err = reader.next_chunk(&cancel).await.unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
    }
}
