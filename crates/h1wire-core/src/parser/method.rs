//! HTTP Method enum
//!
//! The closed set of methods the parser accepts. Matching is exact and
//! case-sensitive: `get` is not `GET`.

use crate::ParseError;

/// HTTP Method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
}

impl Method {
    /// Every supported method
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
    ];

    /// Parse method from bytes - optimized with early first-byte check
    #[inline]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes.first()? {
            b'G' if bytes == b"GET" => Some(Method::Get),
            b'P' => match bytes {
                b"PUT" => Some(Method::Put),
                b"POST" => Some(Method::Post),
                _ => None,
            },
            b'D' if bytes == b"DELETE" => Some(Method::Delete),
            b'O' if bytes == b"OPTIONS" => Some(Method::Options),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl std::str::FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::parse(s.as_bytes()).ok_or_else(|| ParseError::InvalidMethod(s.to_string()))
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
