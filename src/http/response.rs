//! Fixed responses the proxy writes itself.

/// Sent when the request path matches the block pattern.
pub const BLOCKED_RESPONSE: &[u8] = b"HTTP/1.1 403 Forbidden\r\n\
Content-Type: text/plain\r\n\
\r\n\
This request was blocked by the proxy. Access to this URL is restricted.";

/// Sent when the upstream target cannot be reached.
pub const BAD_GATEWAY_RESPONSE: &[u8] = b"HTTP/1.1 502 Bad Gateway\r\n\
Content-Type: text/plain\r\n\
\r\n\
The proxy could not connect to the target server.";

/// First line of an upstream response chunk, if it looks like a status line.
pub fn status_line(chunk: &[u8]) -> Option<&str> {
    if !chunk.starts_with(b"HTTP/") {
        return None;
    }
    let end = chunk
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(chunk.len());
    std::str::from_utf8(&chunk[..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_response_is_exact() {
        assert_eq!(
            BLOCKED_RESPONSE,
            &b"HTTP/1.1 403 Forbidden\r\nContent-Type: text/plain\r\n\r\nThis request was blocked by the proxy. Access to this URL is restricted."[..]
        );
    }

    #[test]
    fn bad_gateway_starts_with_status() {
        assert!(BAD_GATEWAY_RESPONSE.starts_with(b"HTTP/1.1 502 Bad Gateway\r\n"));
    }

    #[test]
    fn extracts_status_line() {
        assert_eq!(status_line(b"HTTP/1.1 200 OK\r\nA: b\r\n"), Some("HTTP/1.1 200 OK"));
        assert_eq!(status_line(b"HTTP/1.0 404 Not Found"), Some("HTTP/1.0 404 Not Found"));
        assert_eq!(status_line(b"<html>"), None);
    }
}
