//! h1wire-core: incremental HTTP/1.1 request parsing
//!
//! Requests are rebuilt from reads whose boundaries never line up with the
//! protocol. The parser reports how many bytes it consumed; the reader keeps
//! the rest for the next round.
//!
//! ## Features
//! - `native` - tokio accept loop, async reassembly and the [`Server`]

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod headers;
pub mod parser;
pub mod reassembly;
pub mod request;
pub mod response;
pub mod testing;

#[cfg(feature = "native")]
pub mod server;

// Re-exports
pub use config::ServerConfig;
pub use error::{Error, ErrorKind, ParseError, Result};
pub use headers::Headers;
pub use parser::{Method, ParseState, RequestParser};
pub use reassembly::{request_from_reader, ReassemblyBuffer, RequestReader};
pub use request::{Request, RequestBuilder, RequestLine};
pub use response::{Handler, HandlerError, Response, ResponseWriter, StatusCode};

#[cfg(feature = "native")]
pub use server::{ConnectionTracker, Server};
