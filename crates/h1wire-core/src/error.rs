//! Error types for h1wire-core

use crate::parser::ParseState;
use thiserror::Error;

/// Result type alias for h1wire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the h1wire server
#[derive(Debug, Error)]
pub enum Error {
    /// Request could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// IO error on the connection or the byte source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// The parse error behind this error, if any
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// Broad class of a [`ParseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bytes on the wire do not form a valid request
    Framing,
    /// The stream ended before the request was complete
    Completeness,
}

/// Fatal request parse errors. None of these are recoverable for the
/// connection that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Request line did not split into method, target and version
    #[error("request line must have exactly 3 parts, found {0}")]
    RequestLineParts(usize),

    /// Method outside the supported set
    #[error("unsupported method: {0:?}")]
    InvalidMethod(String),

    /// Request target failed the shape check
    #[error("invalid request target: {0:?}")]
    InvalidTarget(String),

    /// Version token is not `HTTP/<version>`
    #[error("invalid protocol token: {0:?}")]
    InvalidProtocol(String),

    /// Version other than 1.1
    #[error("unsupported HTTP version: {0:?}")]
    UnsupportedVersion(String),

    /// Field line without a colon
    #[error("malformed field line: missing colon")]
    MissingColon,

    /// Whitespace between field name and colon
    #[error("malformed field line: space before colon")]
    SpaceBeforeColon,

    /// Field name with characters outside the token set
    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),

    /// Field value that is not UTF-8
    #[error("field value is not valid UTF-8")]
    InvalidFieldValue,

    /// Content-Length that is not a non-negative integer
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// Stream ended with fewer body bytes than declared
    #[error("incomplete body: expected {expected} bytes, received {received}")]
    IncompleteBody { expected: usize, received: usize },

    /// Stream ended before the request reached a terminal state
    #[error("unexpected end of stream in {0:?} state")]
    UnexpectedEof(ParseState),
}

impl ParseError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::IncompleteBody { .. } | ParseError::UnexpectedEof(_) => {
                ErrorKind::Completeness
            }
            _ => ErrorKind::Framing,
        }
    }
}
