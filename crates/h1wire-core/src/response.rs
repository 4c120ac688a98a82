//! HTTP Response types and the handler contract

use crate::headers::Headers;
use crate::Request;
use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;
use std::io;
use tracing::debug;

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Get the reason phrase; empty for codes without one
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            500 => "Internal Server Error",
            _ => "",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// Headers every response starts with
pub fn default_headers(content_length: usize) -> SmallVec<[(String, String); 8]> {
    smallvec::smallvec![
        ("Content-Length".to_string(), content_length.to_string()),
        ("Connection".to_string(), "close".to_string()),
        ("Content-Type".to_string(), "text/plain".to_string()),
    ]
}

/// HTTP Response
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Response headers in wire order
    pub headers: SmallVec<[(String, String); 8]>,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Response with the default headers and an empty body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: default_headers(0),
            body: Bytes::new(),
        }
    }

    /// Create a 400 Bad Request response
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    /// Run `handler` and turn its outcome into a response.
    ///
    /// Success is a 200 carrying whatever the handler wrote, with its
    /// headers layered over the defaults. A [`HandlerError`] becomes its
    /// status with an empty body.
    pub fn from_handler<H: Handler + ?Sized>(handler: &H, request: &Request) -> Self {
        let mut writer = ResponseWriter::new();
        match handler.handle(&mut writer, request) {
            Ok(()) => writer.into_response(StatusCode::OK),
            Err(e) => {
                debug!(status = e.status.as_u16(), message = %e.message, "handler returned error");
                Self::new(e.status)
            }
        }
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace a header in place, or append it if absent
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Serialize to HTTP/1.1 wire format
    pub fn to_http1_bytes(&self) -> Bytes {
        let mut buf = Vec::with_capacity(128 + self.body.len());

        // Status line
        buf.extend_from_slice(b"HTTP/1.1 ");
        buf.extend_from_slice(self.status.0.to_string().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.status.reason_phrase().as_bytes());
        buf.extend_from_slice(b"\r\n");

        // Headers
        for (name, value) in &self.headers {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        // End of headers
        buf.extend_from_slice(b"\r\n");

        // Body
        buf.extend_from_slice(&self.body);

        Bytes::from(buf)
    }
}

/// Error a handler returns to answer with a non-200 status.
///
/// The message is for logs only; it never reaches the peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<StatusCode> for HandlerError {
    fn from(status: StatusCode) -> Self {
        Self::new(status, status.reason_phrase())
    }
}

/// Body sink handed to a handler. Bytes written go to the response body;
/// headers set here override the defaults.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: Headers,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Bytes written so far
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Finish with `status`, layering handler headers over the defaults
    pub fn into_response(self, status: StatusCode) -> Response {
        let mut response = Response {
            status,
            headers: default_headers(self.body.len()),
            body: self.body.freeze(),
        };
        let mut overrides: Vec<_> = self.headers.iter().collect();
        overrides.sort_unstable();
        for (name, value) in overrides {
            response.set_header(name, value);
        }
        response
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Request handler: writes a body into the sink or fails with a status
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, w: &mut ResponseWriter, request: &Request) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&mut ResponseWriter, &Request) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, w: &mut ResponseWriter, request: &Request) -> Result<(), HandlerError> {
        self(w, request)
    }
}
