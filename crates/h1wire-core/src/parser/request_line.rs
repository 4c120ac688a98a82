//! Request line parsing: `<METHOD> <TARGET> HTTP/1.1`

use super::{find_crlf, lossy, Method, CRLF};
use crate::request::{RequestLine, HTTP_VERSION};
use crate::ParseError;
use smallvec::SmallVec;

const PROTOCOL: &[u8] = b"HTTP";

/// Parse the request line at the front of `data`.
///
/// Returns `Ok(None)` when no CRLF has arrived yet. On success the byte
/// count includes the terminating CRLF.
pub fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(end) = find_crlf(data) else {
        return Ok(None);
    };
    let line = &data[..end];

    let parts: SmallVec<[&[u8]; 4]> = line.split(|&b| b == b' ').collect();
    let &[method, target, version] = parts.as_slice() else {
        return Err(ParseError::RequestLineParts(parts.len()));
    };

    let method = Method::parse(method).ok_or_else(|| ParseError::InvalidMethod(lossy(method)))?;

    if !is_target_shape(target) {
        return Err(ParseError::InvalidTarget(lossy(target)));
    }
    let target = std::str::from_utf8(target)
        .map_err(|_| ParseError::InvalidTarget(lossy(target)))?;

    let version = parse_version(version)?;

    let request_line = RequestLine {
        method,
        target: target.to_string(),
        version: version.to_string(),
    };
    Ok(Some((request_line, end + CRLF.len())))
}

/// Loose target check: somewhere in the token there must be a `/` or `*`
/// (the start of a `[*/][-_a-zA-Z0-9]*` run). Absolute URIs and
/// percent-encoded paths pass; so do some malformed shapes.
fn is_target_shape(target: &[u8]) -> bool {
    memchr::memchr2(b'/', b'*', target).is_some()
}

/// Split `HTTP/<version>` and check both halves
fn parse_version(token: &[u8]) -> Result<&'static str, ParseError> {
    let Some(slash) = memchr::memchr(b'/', token) else {
        return Err(ParseError::InvalidProtocol(lossy(token)));
    };
    let (protocol, number) = (&token[..slash], &token[slash + 1..]);
    if protocol != PROTOCOL {
        return Err(ParseError::InvalidProtocol(lossy(token)));
    }
    if number != HTTP_VERSION.as_bytes() {
        return Err(ParseError::UnsupportedVersion(lossy(number)));
    }
    Ok(HTTP_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(data: &[u8]) -> (RequestLine, usize) {
        parse_request_line(data)
            .expect("request line should parse")
            .expect("request line should be complete")
    }

    #[test]
    fn test_simple_get() {
        let (line, n) = parse_ok(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");
        assert_eq!(line.method, Method::Get);
        assert_eq!(line.target, "/");
        assert_eq!(line.version, "1.1");
        assert_eq!(n, 16);
    }

    #[test]
    fn test_needs_crlf() {
        assert_eq!(parse_request_line(b"GET / HTTP/1.1").unwrap(), None);
        assert_eq!(parse_request_line(b"GET / HTTP/1.1\r").unwrap(), None);
        assert_eq!(parse_request_line(b"").unwrap(), None);
    }

    #[test]
    fn test_permissive_targets() {
        assert_eq!(parse_ok(b"GET /coffee HTTP/1.1\r\n").0.target, "/coffee");
        assert_eq!(parse_ok(b"OPTIONS * HTTP/1.1\r\n").0.target, "*");
        assert_eq!(
            parse_ok(b"GET http://example.com/path HTTP/1.1\r\n").0.target,
            "http://example.com/path"
        );
        assert_eq!(
            parse_ok(b"GET /path%20with%20spaces HTTP/1.1\r\n").0.target,
            "/path%20with%20spaces"
        );
        assert_eq!(
            parse_ok(b"DELETE /users/123 HTTP/1.1\r\n").0.method,
            Method::Delete
        );
    }

    #[test]
    fn test_wrong_part_count() {
        assert_eq!(
            parse_request_line(b"/coffee HTTP/1.1\r\n"),
            Err(ParseError::RequestLineParts(2))
        );
        assert_eq!(
            parse_request_line(b"GET /path HTTP/1.1 extra\r\n"),
            Err(ParseError::RequestLineParts(4))
        );
        assert_eq!(parse_request_line(b"\r\n"), Err(ParseError::RequestLineParts(1)));
        // a bare LF does not end the line, so the next line's tokens get pulled in
        assert!(parse_request_line(b"GET /path HTTP/1.1\nHost: localhost\r\n").is_err());
    }

    #[test]
    fn test_invalid_method() {
        assert_eq!(
            parse_request_line(b"get /path HTTP/1.1\r\n"),
            Err(ParseError::InvalidMethod("get".into()))
        );
        assert_eq!(
            parse_request_line(b" /path HTTP/1.1\r\n"),
            Err(ParseError::InvalidMethod(String::new()))
        );
        assert!(parse_request_line(b"PATCH /path HTTP/1.1\r\n").is_err());
    }

    #[test]
    fn test_invalid_target() {
        assert_eq!(
            parse_request_line(b"GET  HTTP/1.1\r\n"),
            Err(ParseError::InvalidTarget(String::new()))
        );
        assert!(parse_request_line(b"GET coffee HTTP/1.1\r\n").is_err());
    }

    #[test]
    fn test_invalid_version() {
        assert_eq!(
            parse_request_line(b"GET /path HTTP/2.0\r\n"),
            Err(ParseError::UnsupportedVersion("2.0".into()))
        );
        assert_eq!(
            parse_request_line(b"GET /legacy HTTP/1.0\r\n"),
            Err(ParseError::UnsupportedVersion("1.0".into()))
        );
        assert_eq!(
            parse_request_line(b"GET /path HTTPS/1.1\r\n"),
            Err(ParseError::InvalidProtocol("HTTPS/1.1".into()))
        );
        assert_eq!(
            parse_request_line(b"GET /path \r\n"),
            Err(ParseError::InvalidProtocol(String::new()))
        );
        assert!(parse_request_line(b"GET /path HTTP\r\n").is_err());
    }
}
