//! Field-line parsing, one `name: value` line per call

use super::{find_crlf, lossy, CRLF};
use crate::headers::Headers;
use crate::ParseError;

/// Outcome of a single field-line step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLine {
    /// No complete line buffered yet
    Incomplete,
    /// One field was stored; carries bytes consumed including CRLF
    Parsed(usize),
    /// The blank line ending the header block; carries bytes consumed
    EndOfHeaders(usize),
}

/// Parse at most one field line from the front of `data` into `headers`.
pub fn parse_field_line(data: &[u8], headers: &mut Headers) -> Result<FieldLine, ParseError> {
    if data.starts_with(CRLF) {
        return Ok(FieldLine::EndOfHeaders(CRLF.len()));
    }
    let Some(end) = find_crlf(data) else {
        return Ok(FieldLine::Incomplete);
    };

    let (name, value) = split_field(&data[..end])?;
    headers.append(&name.to_ascii_lowercase(), value);

    Ok(FieldLine::Parsed(end + CRLF.len()))
}

/// Validate one field line and return its name and trimmed value
fn split_field(line: &[u8]) -> Result<(&str, &str), ParseError> {
    let colon = memchr::memchr(b':', line).ok_or(ParseError::MissingColon)?;
    if colon > 0 && line[colon - 1] == b' ' {
        return Err(ParseError::SpaceBeforeColon);
    }

    let line = line.trim_ascii();
    let colon = memchr::memchr(b':', line).ok_or(ParseError::MissingColon)?;
    let (name, value) = (&line[..colon], line[colon + 1..].trim_ascii());

    if name.is_empty() || !name.iter().all(|&b| is_tchar(b)) {
        return Err(ParseError::InvalidFieldName(lossy(name)));
    }
    // tchar bytes are ASCII
    let name = std::str::from_utf8(name).map_err(|_| ParseError::InvalidFieldName(lossy(name)))?;
    let value = std::str::from_utf8(value).map_err(|_| ParseError::InvalidFieldValue)?;

    Ok((name, value))
}

/// RFC 9110 token character
pub fn is_tchar(b: u8) -> bool {
    matches!(b,
        b'a'..=b'z'
        | b'A'..=b'Z'
        | b'0'..=b'9'
        | b'!' | b'#' | b'$' | b'%' | b'&' | b'\''
        | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
        | b'`' | b'|' | b'~'
    )
}
