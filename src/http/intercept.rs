//! Request-line interception: block or rewrite the first chunk.
//!
//! `intercept` is a pure function of the preamble and the policy, so every
//! decision the proxy makes about a request can be tested without sockets.

use crate::config::{InjectHeader, PolicyConfig};
use crate::http::request::{first_line, RequestLine};
use crate::http::response::BLOCKED_RESPONSE;

/// What to do with the preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Forward these bytes upstream, then relay the rest untouched.
    PassThrough(Vec<u8>),
    /// Answer the client with these bytes; never contact the upstream.
    Blocked(&'static [u8]),
}

/// Result of inspecting one preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interception {
    /// Request path, present iff the first line parsed as a request line.
    pub path: Option<String>,
    /// Method and version of the request line, for logging.
    pub method: Option<String>,
    pub version: Option<String>,
    /// True when the inject header was inserted.
    pub injected: bool,
    pub outcome: Outcome,
}

impl Interception {
    fn opaque(preamble: &[u8]) -> Self {
        Self {
            path: None,
            method: None,
            version: None,
            injected: false,
            outcome: Outcome::PassThrough(preamble.to_vec()),
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.outcome, Outcome::Blocked(_))
    }
}

/// Inspect the first chunk read from a client.
///
/// Non-HTTP input is passed through unchanged. A path containing the block
/// pattern is answered with 403. Otherwise the inject header, if any, is
/// inserted directly after the request line.
pub fn intercept(preamble: &[u8], policy: &PolicyConfig) -> Interception {
    let span = first_line(preamble);
    let Some(line) = RequestLine::parse(&preamble[..span.len]) else {
        return Interception::opaque(preamble);
    };

    let mut interception = Interception {
        path: Some(line.path.to_string()),
        method: Some(line.method.to_string()),
        version: Some(line.version.to_string()),
        injected: false,
        outcome: Outcome::PassThrough(Vec::new()),
    };

    if let Some(pattern) = policy.block_pattern.as_deref() {
        if line.path.contains(pattern) {
            interception.outcome = Outcome::Blocked(BLOCKED_RESPONSE);
            return interception;
        }
    }

    let rewritten = match (&policy.inject_header, span.terminator) {
        (Some(header), Some(terminator)) if !has_header_line(&preamble[span.end()..], header) => {
            interception.injected = true;
            inject(preamble, span.end(), header, terminator)
        }
        _ => preamble.to_vec(),
    };
    interception.outcome = Outcome::PassThrough(rewritten);
    interception
}

fn inject(preamble: &[u8], at: usize, header: &InjectHeader, terminator: &str) -> Vec<u8> {
    let line = header.line();
    let mut out = Vec::with_capacity(preamble.len() + line.len() + terminator.len());
    out.extend_from_slice(&preamble[..at]);
    out.extend_from_slice(line.as_bytes());
    out.extend_from_slice(terminator.as_bytes());
    out.extend_from_slice(&preamble[at..]);
    out
}

/// True if the header block already carries exactly this header line
/// (name compared case-insensitively, value exactly).
fn has_header_line(headers: &[u8], header: &InjectHeader) -> bool {
    headers
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .take_while(|line| !line.is_empty())
        .filter_map(|line| {
            let colon = line.iter().position(|&b| b == b':')?;
            Some((&line[..colon], line[colon + 1..].trim_ascii()))
        })
        .any(|(name, value)| {
            name.eq_ignore_ascii_case(header.name().as_bytes()) && value == header.value().as_bytes()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(block: Option<&str>, inject: Option<&str>) -> PolicyConfig {
        PolicyConfig {
            block_pattern: block.map(str::to_string),
            inject_header: inject.map(|h| h.parse().unwrap()),
        }
    }

    fn forwarded(interception: &Interception) -> &[u8] {
        match &interception.outcome {
            Outcome::PassThrough(bytes) => bytes,
            Outcome::Blocked(_) => panic!("unexpectedly blocked"),
        }
    }

    #[test]
    fn blocks_matching_path() {
        let result = intercept(b"GET /ip HTTP/1.1\r\nHost: httpbin.org\r\n\r\n", &policy(Some("/ip"), None));
        assert_eq!(result.outcome, Outcome::Blocked(BLOCKED_RESPONSE));
        assert_eq!(result.path.as_deref(), Some("/ip"));
        assert!(result.is_blocked());
    }

    #[test]
    fn block_is_substring_match() {
        let result = intercept(b"GET /v1/ip/lookup HTTP/1.1\r\n\r\n", &policy(Some("/ip"), None));
        assert!(result.is_blocked());
    }

    #[test]
    fn passes_non_matching_path_unchanged() {
        let request = b"GET /get HTTP/1.1\r\nHost: httpbin.org\r\n\r\n";
        let result = intercept(request, &policy(Some("/ip"), None));
        assert_eq!(forwarded(&result), request);
        assert_eq!(result.path.as_deref(), Some("/get"));
        assert_eq!(result.method.as_deref(), Some("GET"));
        assert!(!result.injected);
    }

    #[test]
    fn injects_header_after_request_line() {
        let result = intercept(
            b"GET /headers HTTP/1.1\r\nHost: httpbin.org\r\n\r\n",
            &policy(None, Some("X-Proxy-Header: LightLinksProxy")),
        );
        assert_eq!(
            forwarded(&result),
            b"GET /headers HTTP/1.1\r\nX-Proxy-Header: LightLinksProxy\r\nHost: httpbin.org\r\n\r\n"
        );
        assert!(result.injected);
    }

    #[test]
    fn injection_keeps_bare_lf_terminator() {
        let result = intercept(b"GET / HTTP/1.0\nHost: a\n\n", &policy(None, Some("X-A: 1")));
        assert_eq!(forwarded(&result), b"GET / HTTP/1.0\nX-A: 1\nHost: a\n\n");
    }

    #[test]
    fn injection_preserves_body_bytes() {
        let result = intercept(
            b"POST /post HTTP/1.1\r\nContent-Length: 4\r\n\r\nbody",
            &policy(None, Some("X-A: 1")),
        );
        assert_eq!(
            forwarded(&result),
            b"POST /post HTTP/1.1\r\nX-A: 1\r\nContent-Length: 4\r\n\r\nbody"
        );
    }

    #[test]
    fn injection_does_not_duplicate_identical_header() {
        let request = b"GET / HTTP/1.1\r\nx-proxy-header: LightLinksProxy\r\n\r\n";
        let result = intercept(request, &policy(None, Some("X-Proxy-Header: LightLinksProxy")));
        assert_eq!(forwarded(&result), request);
        assert!(!result.injected);
    }

    #[test]
    fn injection_does_not_overwrite_different_value() {
        let result = intercept(
            b"GET / HTTP/1.1\r\nX-Proxy-Header: other\r\n\r\n",
            &policy(None, Some("X-Proxy-Header: LightLinksProxy")),
        );
        assert_eq!(
            forwarded(&result),
            b"GET / HTTP/1.1\r\nX-Proxy-Header: LightLinksProxy\r\nX-Proxy-Header: other\r\n\r\n"
        );
    }

    #[test]
    fn header_in_body_does_not_suppress_injection() {
        let result = intercept(
            b"POST / HTTP/1.1\r\n\r\nX-A: 1\r\n",
            &policy(None, Some("X-A: 1")),
        );
        assert!(result.injected);
    }

    #[test]
    fn partial_line_is_counted_but_not_rewritten() {
        let result = intercept(b"GET /slow HTTP/1.1", &policy(None, Some("X-A: 1")));
        assert_eq!(result.path.as_deref(), Some("/slow"));
        assert_eq!(forwarded(&result), b"GET /slow HTTP/1.1");
        assert!(!result.injected);
    }

    #[test]
    fn opaque_bytes_pass_through() {
        let tls_hello = b"\x16\x03\x01\x00\xa5\x01\x00\x00\xa1\x03\x03";
        let result = intercept(tls_hello, &policy(Some("/"), Some("X-A: 1")));
        assert_eq!(forwarded(&result), tls_hello);
        assert_eq!(result.path, None);
    }

    #[test]
    fn block_wins_over_injection() {
        let result = intercept(b"GET /ip HTTP/1.1\r\n\r\n", &policy(Some("/ip"), Some("X-A: 1")));
        assert!(result.is_blocked());
        assert!(!result.injected);
    }
}
