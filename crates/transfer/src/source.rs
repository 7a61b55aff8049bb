//! Byte sources an upload can read from.
//!
//! A source is any [`AsyncRead`]; seeking is an optional capability queried
//! through [`ChunkSource::seekable`]. The upload session asks for it when the
//! receiver reports previously stored bytes: a seekable source resumes at
//! that offset, anything else restarts from zero.

use std::io::{self, Cursor, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

/// Seek capability of a [`ChunkSource`].
pub trait SeekSource: AsyncSeek + Send + Unpin {}

impl<T: AsyncSeek + Send + Unpin + ?Sized> SeekSource for T {}

/// An upload source with an optional seek capability.
pub trait ChunkSource: AsyncRead + Send + Unpin {
    /// Returns the seek half of this source, or `None` if the source can
    /// only be read forward.
    fn seekable(&mut self) -> Option<&mut dyn SeekSource> {
        None
    }
}

impl ChunkSource for tokio::fs::File {
    fn seekable(&mut self) -> Option<&mut dyn SeekSource> {
        Some(self)
    }
}

impl<T: AsRef<[u8]> + Send + Unpin> ChunkSource for Cursor<T> {
    fn seekable(&mut self) -> Option<&mut dyn SeekSource> {
        Some(self)
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn seekable(&mut self) -> Option<&mut dyn SeekSource> {
        (**self).seekable()
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    fn seekable(&mut self) -> Option<&mut dyn SeekSource> {
        (**self).seekable()
    }
}

/// Tags a reader that supports seeking.
#[derive(Debug)]
pub struct Seekable<R>(R);

impl<R> Seekable<R> {
    pub fn new(inner: R) -> Self {
        Self(inner)
    }

    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Seekable<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl<R: AsyncSeek + Unpin> AsyncSeek for Seekable<R> {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.0).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.0).poll_complete(cx)
    }
}

impl<R: AsyncRead + AsyncSeek + Send + Unpin> ChunkSource for Seekable<R> {
    fn seekable(&mut self) -> Option<&mut dyn SeekSource> {
        Some(self)
    }
}

/// Tags a forward-only reader (pipes, sockets, response bodies).
///
/// Wrapping a seekable reader hides its seek capability, which forces a
/// restart instead of a resume.
#[derive(Debug)]
pub struct Unseekable<R>(R);

impl<R> Unseekable<R> {
    pub fn new(inner: R) -> Self {
        Self(inner)
    }

    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Unseekable<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl<R: AsyncRead + Send + Unpin> ChunkSource for Unseekable<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    #[tokio::test]
    async fn cursor_is_seekable() {
        let mut source = Cursor::new(b"0123456789".to_vec());
        let seeker = source.seekable().expect("cursor should be seekable");
        seeker.seek(SeekFrom::Start(6)).await.unwrap();

        let mut rest = String::new();
        source.read_to_string(&mut rest).await.unwrap();
        assert_eq!(rest, "6789");
    }

    #[tokio::test]
    async fn unseekable_hides_seek() {
        let mut source = Unseekable::new(Cursor::new(b"abc".to_vec()));
        assert!(source.seekable().is_none());

        let mut all = Vec::new();
        source.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, b"abc");
    }

    #[tokio::test]
    async fn seekable_wrapper_exposes_seek() {
        let mut source = Seekable::new(Cursor::new(b"hello world".to_vec()));
        source
            .seekable()
            .unwrap()
            .seek(SeekFrom::Start(6))
            .await
            .unwrap();

        let mut rest = String::new();
        source.read_to_string(&mut rest).await.unwrap();
        assert_eq!(rest, "world");
    }

    #[tokio::test]
    async fn boxed_source_keeps_capability() {
        let mut seekable: Box<dyn ChunkSource> = Box::new(Cursor::new(Vec::<u8>::new()));
        assert!(seekable.seekable().is_some());

        let mut pipe: Box<dyn ChunkSource> = Box::new(Unseekable::new(tokio::io::empty()));
        assert!(pipe.seekable().is_none());
    }

    #[tokio::test]
    async fn file_is_seekable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"abcdef").unwrap();

        let mut file = tokio::fs::File::open(&path).await.unwrap();
        file.seekable()
            .unwrap()
            .seek(SeekFrom::Start(3))
            .await
            .unwrap();
        let mut rest = Vec::new();
        file.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"def");
    }
}
