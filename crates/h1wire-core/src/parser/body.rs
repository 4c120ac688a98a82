//! Body accumulation up to a declared Content-Length

use crate::headers::Headers;
use crate::ParseError;
use bytes::{Bytes, BytesMut};

/// Upfront allocation cap; the declared length comes from the peer
const INITIAL_CAPACITY: usize = 8 * 1024;

/// Collects body bytes until the declared length is reached
#[derive(Debug)]
pub struct BodyAccumulator {
    expected: usize,
    body: BytesMut,
}

impl BodyAccumulator {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            body: BytesMut::with_capacity(expected.min(INITIAL_CAPACITY)),
        }
    }

    /// Build from the `content-length` header. `None` means the request has
    /// no body.
    pub fn from_headers(headers: &Headers) -> Result<Option<Self>, ParseError> {
        headers
            .get("content-length")
            .map(|value| parse_content_length(value).map(Self::new))
            .transpose()
    }

    /// Append as much of `data` as still fits; returns bytes taken.
    pub fn fill(&mut self, data: &[u8]) -> usize {
        let take = self.remaining().min(data.len());
        self.body.extend_from_slice(&data[..take]);
        take
    }

    pub fn remaining(&self) -> usize {
        self.expected - self.body.len()
    }

    pub fn is_complete(&self) -> bool {
        self.body.len() == self.expected
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.body.len()
    }

    pub fn into_bytes(self) -> Bytes {
        self.body.freeze()
    }
}

/// Content-Length must be plain decimal digits
pub fn parse_content_length(value: &str) -> Result<usize, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength(value.to_string()));
    }
    value
        .parse()
        .map_err(|_| ParseError::InvalidContentLength(value.to_string()))
}
