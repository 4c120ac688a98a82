//! Incremental HTTP/1.1 request parser
//!
//! [`RequestParser`] is fed the unconsumed front of a byte stream and
//! reports how many bytes it used. It never needs the whole request at
//! once: the caller keeps whatever was not consumed and hands it back,
//! with more bytes appended, on the next call.
//!
//! ```
//! use h1wire_core::parser::{ParseState, RequestParser};
//!
//! let mut parser = RequestParser::new();
//! assert_eq!(parser.parse(b"GET / HT").unwrap(), 0);
//! assert_eq!(parser.parse(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n").unwrap(), 27);
//! assert_eq!(parser.state(), ParseState::Done);
//!
//! let request = parser.finish().unwrap();
//! assert_eq!(request.target(), "/");
//! assert_eq!(request.header("host"), Some("a"));
//! ```

mod body;
mod headers;
mod method;
mod request_line;

pub use body::{parse_content_length, BodyAccumulator};
pub use headers::{is_tchar, parse_field_line, FieldLine};
pub use method::Method;
pub use request_line::parse_request_line;

use crate::headers::Headers;
use crate::request::{Request, RequestLine};
use crate::ParseError;
use bytes::Bytes;
use tracing::trace;

pub(crate) const CRLF: &[u8] = b"\r\n";

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    memchr::memmem::find(data, CRLF)
}

pub(crate) fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parser progress. Variants are declared in the only order the parser
/// may move through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParseState {
    /// Waiting for the request line
    Init,
    /// Collecting field lines
    Headers,
    /// Collecting Content-Length bytes
    Body,
    /// Terminal; further input is ignored
    Done,
}

/// Request state machine
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,
    request_line: Option<RequestLine>,
    headers: Headers,
    body: Option<BodyAccumulator>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Init,
            request_line: None,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    pub fn request_line(&self) -> Option<&RequestLine> {
        self.request_line.as_ref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Consume as much of `data` as possible.
    ///
    /// Returns the number of bytes used across every step that ran. Bytes
    /// past that count must be passed again on the next call. Once the
    /// parser is [`ParseState::Done`] this always returns `Ok(0)`.
    ///
    /// An error is fatal: the parser must not be fed again.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut consumed = 0;

        loop {
            let rest = &data[consumed..];
            match self.state {
                ParseState::Init => match parse_request_line(rest)? {
                    Some((request_line, n)) => {
                        self.request_line = Some(request_line);
                        consumed += n;
                        self.advance(ParseState::Headers);
                    }
                    None => break,
                },
                ParseState::Headers => match parse_field_line(rest, &mut self.headers)? {
                    FieldLine::Incomplete => break,
                    FieldLine::Parsed(n) => consumed += n,
                    FieldLine::EndOfHeaders(n) => {
                        consumed += n;
                        self.advance(ParseState::Body);
                    }
                },
                ParseState::Body => {
                    consumed += self.parse_body(rest)?;
                    if self.state == ParseState::Body {
                        break;
                    }
                }
                ParseState::Done => break,
            }
        }

        Ok(consumed)
    }

    /// Resolve the request once the byte source is exhausted.
    ///
    /// A body that is still short of its declared length is an
    /// [`ParseError::IncompleteBody`]; any other non-terminal state is an
    /// [`ParseError::UnexpectedEof`].
    pub fn finish(mut self) -> Result<Request, ParseError> {
        if self.state == ParseState::Body {
            self.parse_body(&[])?;
        }

        if self.state == ParseState::Body {
            if let Some(body) = &self.body {
                return Err(ParseError::IncompleteBody {
                    expected: body.expected(),
                    received: body.received(),
                });
            }
        }

        match (self.state, self.request_line) {
            (ParseState::Done, Some(request_line)) => {
                let body = self.body.map(BodyAccumulator::into_bytes).unwrap_or_else(Bytes::new);
                Ok(Request::from_parts(request_line, self.headers, body))
            }
            (state, _) => Err(ParseError::UnexpectedEof(state)),
        }
    }

    fn parse_body(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut body = match self.body.take() {
            Some(body) => body,
            None => match BodyAccumulator::from_headers(&self.headers)? {
                Some(body) => body,
                None => {
                    self.advance(ParseState::Done);
                    return Ok(0);
                }
            },
        };

        let n = body.fill(data);
        if body.is_complete() {
            self.advance(ParseState::Done);
        }
        self.body = Some(body);
        Ok(n)
    }

    fn advance(&mut self, next: ParseState) {
        debug_assert!(next > self.state, "parse state must move forward");
        trace!(from = ?self.state, to = ?next, "parse state transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(data: &[u8]) -> (RequestParser, usize) {
        let mut parser = RequestParser::new();
        let n = parser.parse(data).expect("request should parse");
        (parser, n)
    }

    #[test]
    fn test_minimal_get() {
        let data = b"GET / HTTP/1.1\r\n\r\n";
        let (parser, n) = parse_all(data);
        assert_eq!(n, data.len());
        assert!(parser.is_done());

        let request = parser.finish().unwrap();
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.target(), "/");
        assert_eq!(request.version(), "1.1");
        assert!(request.headers().is_empty());
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_continues_past_request_line_in_one_call() {
        let data = b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\nAccept: */*\r\n";
        let (parser, n) = parse_all(data);
        assert_eq!(n, data.len());
        assert_eq!(parser.state(), ParseState::Headers);
        assert_eq!(parser.headers().get("accept"), Some("*/*"));
    }

    #[test]
    fn test_partial_header_is_held_back() {
        let data = b"GET / HTTP/1.1\r\nHost: localhost\r\nUser-Agent: te";
        let (parser, n) = parse_all(data);
        assert_eq!(n, 16 + 17);
        assert_eq!(parser.state(), ParseState::Headers);
        assert_eq!(parser.headers().get("user-agent"), None);
    }

    #[test]
    fn test_need_more_consumes_nothing() {
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(b"").unwrap(), 0);
        assert_eq!(parser.parse(b"POST /submit HTTP/1").unwrap(), 0);
        assert_eq!(parser.state(), ParseState::Init);
    }

    #[test]
    fn test_duplicate_headers_joined() {
        let data = b"GET / HTTP/1.1\r\nSet-Cookie: a\r\nSet-Cookie: b\r\n\r\n";
        let request = parse_all(data).0.finish().unwrap();
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("set-cookie"), Some("a, b"));
    }

    #[test]
    fn test_body_across_calls() {
        let mut parser = RequestParser::new();
        let head = b"POST /submit HTTP/1.1\r\nContent-Length: 13\r\n\r\nhello";
        assert_eq!(parser.parse(head).unwrap(), head.len());
        assert_eq!(parser.state(), ParseState::Body);

        assert_eq!(parser.parse(b" world!\n").unwrap(), 8);
        assert!(parser.is_done());
        assert_eq!(parser.finish().unwrap().body().as_ref(), b"hello world!\n");
    }

    #[test]
    fn test_body_stops_at_declared_length() {
        let data = b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\n12345EXTRA";
        let (parser, n) = parse_all(data);
        assert_eq!(n, data.len() - 5);
        assert_eq!(parser.finish().unwrap().body().as_ref(), b"12345");
    }

    #[test]
    fn test_no_content_length_done_after_headers() {
        let data = b"POST /submit HTTP/1.1\r\nHost: localhost\r\n\r\nbody without length";
        let (parser, n) = parse_all(data);
        assert!(parser.is_done());
        assert_eq!(n, data.len() - "body without length".len());
        assert!(parser.finish().unwrap().body().is_empty());
    }

    #[test]
    fn test_zero_content_length() {
        let (parser, _) = parse_all(b"POST /submit HTTP/1.1\r\nContent-Length: 0\r\n\r\n");
        assert!(parser.is_done());
        assert!(parser.finish().unwrap().body().is_empty());
    }

    #[test]
    fn test_invalid_content_length() {
        let mut parser = RequestParser::new();
        let err = parser
            .parse(b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n")
            .unwrap_err();
        assert_eq!(err, ParseError::InvalidContentLength("lots".into()));
    }

    #[test]
    fn test_done_is_idempotent() {
        let (mut parser, _) = parse_all(b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\n\r\n").unwrap(), 0);
        assert_eq!(parser.parse(b"\x00garbage").unwrap(), 0);
        assert!(parser.is_done());
    }

    #[test]
    fn test_error_discards_partial_progress() {
        let mut parser = RequestParser::new();
        let result = parser.parse(b"GET / HTTP/1.1\r\nHost: ok\r\nHost : bad\r\n\r\n");
        assert_eq!(result, Err(ParseError::SpaceBeforeColon));
    }

    #[test]
    fn test_finish_incomplete_body() {
        let mut parser = RequestParser::new();
        parser
            .parse(b"POST /submit HTTP/1.1\r\nContent-Length: 13\r\n\r\nhello worl")
            .unwrap();
        assert_eq!(
            parser.finish(),
            Err(ParseError::IncompleteBody { expected: 13, received: 10 })
        );
    }

    #[test]
    fn test_finish_before_headers_end() {
        let mut parser = RequestParser::new();
        parser.parse(b"GET / HTTP/1.1\r\nHost: localhost\r\n").unwrap();
        assert_eq!(
            parser.finish(),
            Err(ParseError::UnexpectedEof(ParseState::Headers))
        );
        assert_eq!(
            RequestParser::new().finish(),
            Err(ParseError::UnexpectedEof(ParseState::Init))
        );
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(ParseState::Init < ParseState::Headers);
        assert!(ParseState::Headers < ParseState::Body);
        assert!(ParseState::Body < ParseState::Done);
    }
}
