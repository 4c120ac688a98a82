//! HTTP Request types

use crate::headers::Headers;
use crate::parser::Method;
use bytes::Bytes;

/// The only protocol version the parser accepts
pub const HTTP_VERSION: &str = "1.1";

/// Parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// HTTP method
    pub method: Method,
    /// Request target as it appeared on the wire
    pub target: String,
    /// Version number without the `HTTP/` prefix
    pub version: String,
}

impl RequestLine {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            version: HTTP_VERSION.to_string(),
        }
    }
}

/// A complete HTTP request. Only produced once parsing reached `Done`,
/// so every field is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    request_line: RequestLine,
    headers: Headers,
    body: Bytes,
}

impl Request {
    pub(crate) fn from_parts(request_line: RequestLine, headers: Headers, body: Bytes) -> Self {
        Self {
            request_line,
            headers,
            body,
        }
    }

    pub fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    pub fn method(&self) -> Method {
        self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    pub fn version(&self) -> &str {
        &self.request_line.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Builder for constructing requests without going through the parser
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            request: Request::from_parts(RequestLine::new(method, target), Headers::new(), Bytes::new()),
        }
    }

    /// Add a header, joining duplicates
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.request.headers.append(name, value);
        self
    }

    /// Set body and a matching content-length
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.request.headers.set("content-length", body.len().to_string());
        self.request.body = body;
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}
