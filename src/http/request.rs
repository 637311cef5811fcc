//! Request-line parsing.
//!
//! Only the first line of the preamble is understood; everything after it is
//! opaque bytes.

use crate::config::schema::is_token_byte;

/// `METHOD SP PATH SP VERSION` parsed from the first line of a preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub version: &'a str,
}

/// Where the first line sits inside the preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    /// Length of the line without its terminator.
    pub len: usize,
    /// The terminator that ended the line, if the chunk contained one.
    pub terminator: Option<&'static str>,
}

impl LineSpan {
    /// Offset of the first byte after the line terminator.
    pub fn end(&self) -> usize {
        self.len + self.terminator.map_or(0, str::len)
    }
}

/// Locate the first line of `preamble`.
pub fn first_line(preamble: &[u8]) -> LineSpan {
    match preamble.iter().position(|&b| b == b'\n') {
        Some(lf) if lf > 0 && preamble[lf - 1] == b'\r' => LineSpan {
            len: lf - 1,
            terminator: Some("\r\n"),
        },
        Some(lf) => LineSpan {
            len: lf,
            terminator: Some("\n"),
        },
        None => LineSpan {
            len: preamble.len(),
            terminator: None,
        },
    }
}

impl<'a> RequestLine<'a> {
    /// Parse a request line. Returns `None` for anything that is not
    /// exactly three single-space separated parts with an `HTTP/` version.
    pub fn parse(line: &'a [u8]) -> Option<Self> {
        let line = std::str::from_utf8(line).ok()?;
        let mut parts = line.split(' ');
        let method = parts.next()?;
        let path = parts.next()?;
        let version = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        if method.is_empty() || !method.bytes().all(is_token_byte) {
            return None;
        }
        if path.is_empty() || path.bytes().any(|b| b.is_ascii_control()) {
            return None;
        }
        if !version.starts_with("HTTP/") {
            return None;
        }

        Some(Self {
            method,
            path,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_line() {
        let line = RequestLine::parse(b"GET /get?x=1 HTTP/1.1").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.path, "/get?x=1");
        assert_eq!(line.version, "HTTP/1.1");
    }

    #[test]
    fn accepts_absolute_form_targets() {
        let line = RequestLine::parse(b"GET http://httpbin.org/ip HTTP/1.0").unwrap();
        assert_eq!(line.path, "http://httpbin.org/ip");
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in [
            &b""[..],
            b"GET",
            b"GET /",
            b"GET  / HTTP/1.1",
            b"GET / HTTP/1.1 extra",
            b"GET / SSH-2.0",
            b"G\x01T / HTTP/1.1",
            b"\x16\x03\x01\x02\x00",
            b"GET /\xff HTTP/1.1",
        ] {
            assert_eq!(RequestLine::parse(line), None, "{:?}", line);
        }
    }

    #[test]
    fn finds_first_line() {
        assert_eq!(
            first_line(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"),
            LineSpan { len: 14, terminator: Some("\r\n") }
        );
        assert_eq!(
            first_line(b"GET / HTTP/1.1\nHost: a\n"),
            LineSpan { len: 14, terminator: Some("\n") }
        );
        let partial = first_line(b"GET / HTT");
        assert_eq!(partial, LineSpan { len: 9, terminator: None });
        assert_eq!(partial.end(), 9);
    }
}
