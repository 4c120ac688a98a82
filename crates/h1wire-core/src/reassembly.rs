//! Buffer reassembly
//!
//! Reads arrive in chunks whose boundaries have nothing to do with the
//! protocol. [`RequestReader`] appends each chunk to a [`ReassemblyBuffer`],
//! offers the whole unconsumed buffer to the [`RequestParser`], and drops
//! only what the parser consumed. The remainder stays at the front of the
//! buffer for the next round.

use crate::parser::RequestParser;
use crate::{ParseError, Request, Result};
use bytes::{Buf, BytesMut};
use std::io::{self, Read};
use tracing::trace;

#[cfg(feature = "native")]
use tokio::io::{AsyncRead, AsyncReadExt};

/// Initial buffer capacity when none is given
pub const DEFAULT_BUFFER_SIZE: usize = 8;

/// Bytes read from the source but not yet consumed by the parser.
///
/// Invariant: bytes `[0, len)` are exactly the unconsumed suffix of the
/// stream, in order.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    buf: BytesMut,
    initial_capacity: usize,
}

impl Default for ReassemblyBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }
}

impl ReassemblyBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: BytesMut::with_capacity(capacity),
            initial_capacity: capacity,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Append bytes that did not come through [`read_from`](Self::read_from)
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Drop the first `n` bytes; the rest move to the front.
    ///
    /// # Panics
    ///
    /// If `n` exceeds the buffered length.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.buf.len(), "consumed past end of reassembly buffer");
        self.buf.advance(n);
    }

    /// Make room for at least one more byte, doubling when full.
    fn reserve_for_read(&mut self) {
        if self.buf.len() == self.buf.capacity() {
            let additional = self.buf.capacity().max(self.initial_capacity);
            self.buf.reserve(additional);
        }
    }

    /// Read one chunk from `reader` into the free space after the data.
    /// Returns `Ok(0)` at end of stream.
    pub fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<usize> {
        self.reserve_for_read();
        let filled = self.buf.len();
        self.buf.resize(self.buf.capacity(), 0);
        let result = reader.read(&mut self.buf[filled..]);
        self.buf.truncate(filled + result.as_ref().map_or(0, |n| *n));
        result
    }

    /// Async counterpart of [`read_from`](Self::read_from)
    #[cfg(feature = "native")]
    pub async fn read_from_async<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> io::Result<usize> {
        self.reserve_for_read();
        reader.read_buf(&mut self.buf).await
    }
}

/// Drives a [`RequestParser`] from a byte source through a
/// [`ReassemblyBuffer`].
#[derive(Debug, Default)]
pub struct RequestReader {
    parser: RequestParser,
    buffer: ReassemblyBuffer,
}

impl RequestReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(size: usize) -> Self {
        Self {
            parser: RequestParser::new(),
            buffer: ReassemblyBuffer::with_capacity(size),
        }
    }

    pub fn parser(&self) -> &RequestParser {
        &self.parser
    }

    /// Bytes read but not yet consumed
    pub fn buffered(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Offer the whole buffer to the parser and drop what it consumed
    pub fn process(&mut self) -> std::result::Result<usize, ParseError> {
        let n = self.parser.parse(self.buffer.as_slice())?;
        if n > 0 {
            self.buffer.consume(n);
            trace!(consumed = n, buffered = self.buffer.len(), state = ?self.parser.state(), "parsed");
        }
        Ok(n)
    }

    /// Append a chunk and process it
    pub fn push(&mut self, chunk: &[u8]) -> std::result::Result<usize, ParseError> {
        self.buffer.extend_from_slice(chunk);
        self.process()
    }

    /// End of stream: one final parse attempt, then resolve the request
    pub fn finish(mut self) -> std::result::Result<Request, ParseError> {
        self.process()?;
        self.parser.finish()
    }

    /// Read from `reader` until the request is complete or the stream ends
    pub fn read_from<R: Read>(mut self, mut reader: R) -> Result<Request> {
        while !self.parser.is_done() {
            let n = match self.buffer.read_from(&mut reader) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                break;
            }
            self.process()?;
        }
        Ok(self.finish()?)
    }

    /// Async counterpart of [`read_from`](Self::read_from)
    #[cfg(feature = "native")]
    pub async fn read_from_async<R: AsyncRead + Unpin>(
        mut self,
        reader: &mut R,
    ) -> Result<Request> {
        while !self.parser.is_done() {
            let n = match self.buffer.read_from_async(reader).await {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                break;
            }
            self.process()?;
        }
        Ok(self.finish()?)
    }
}

/// Parse one request from a blocking byte source
pub fn request_from_reader<R: Read>(reader: R) -> Result<Request> {
    RequestReader::new().read_from(reader)
}
