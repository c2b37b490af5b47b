//! Chunked body suppliers.
//!
//! [`BodySource`] abstracts where body bytes come from: the reader asks for
//! at most `max_len` bytes at a time and each call is a suspension point that
//! may wait on the network. Implementations report end-of-body through
//! [`BodyChunk::finished`].

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// One read's worth of body bytes plus whether more data may follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyChunk {
    pub bytes: Bytes,
    /// True when the body has no more bytes after this chunk
    pub finished: bool,
}

/// Abstract chunked byte supplier driving a parse.
///
/// External timeouts or cancellation surface as `io::Error`s from `read`,
/// which the parser propagates upward as fatal rather than retrying.
#[async_trait]
pub trait BodySource {
    /// Reads up to `max_len` bytes, suspending while data is unavailable.
    async fn read(&mut self, max_len: usize) -> io::Result<BodyChunk>;
}

/// An in-memory body, mostly useful in tests and demos.
#[derive(Debug, Clone)]
pub struct BytesSource {
    remaining: Bytes,
}

impl BytesSource {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { remaining: bytes.into() }
    }
}

#[async_trait]
impl BodySource for BytesSource {
    async fn read(&mut self, max_len: usize) -> io::Result<BodyChunk> {
        let len = max_len.min(self.remaining.len());
        let bytes = self.remaining.split_to(len);
        Ok(BodyChunk { bytes, finished: self.remaining.is_empty() })
    }
}

/// Adapts any [`AsyncRead`] into a [`BodySource`].
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> BodySource for ReaderSource<R> {
    async fn read(&mut self, max_len: usize) -> io::Result<BodyChunk> {
        let mut buf = vec![0u8; max_len];
        let n = self.reader.read(&mut buf).await?;
        buf.truncate(n);
        // a zero-length read on an AsyncRead means end of stream
        Ok(BodyChunk { bytes: Bytes::from(buf), finished: n == 0 })
    }
}
