//! Test doubles for driving the parser with awkward read patterns.

use std::io::{self, Read};

/// A byte source that hands out at most `per_read` bytes per call, like a
/// network connection delivering a message in small pieces.
#[derive(Debug, Clone)]
pub struct ChunkReader {
    data: Vec<u8>,
    per_read: usize,
    pos: usize,
}

impl ChunkReader {
    pub fn new(data: impl AsRef<[u8]>, per_read: usize) -> Self {
        Self {
            data: data.as_ref().to_vec(),
            per_read: per_read.max(1),
            pos: 0,
        }
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn next_chunk(&mut self, room: usize) -> &[u8] {
        let start = self.pos;
        let end = (start + self.per_read).min(self.data.len()).min(start + room);
        self.pos = end;
        &self.data[start..end]
    }
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.next_chunk(buf.len());
        let n = chunk.len();
        buf[..n].copy_from_slice(chunk);
        Ok(n)
    }
}

#[cfg(feature = "native")]
impl tokio::io::AsyncRead for ChunkReader {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        let room = buf.remaining();
        let chunk = self.get_mut().next_chunk(room);
        buf.put_slice(chunk);
        std::task::Poll::Ready(Ok(()))
    }
}
