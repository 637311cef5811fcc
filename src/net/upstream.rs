//! Upstream connector.
//!
//! One attempt per connection with a bounded timeout. Retrying is left to
//! the caller, and this proxy never retries.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

/// Failure to reach the upstream target.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("connect to {target} timed out after {timeout:?}")]
    Timeout { target: String, timeout: Duration },

    #[error("connect to {target} failed: {source}")]
    Io {
        target: String,
        #[source]
        source: io::Error,
    },
}

impl ConnectError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ConnectError::Timeout { .. } => "timeout",
            ConnectError::Io { source, .. } => match source.kind() {
                io::ErrorKind::ConnectionRefused => "refused",
                io::ErrorKind::TimedOut => "timeout",
                _ => "unreachable",
            },
        }
    }
}

/// Open a connection to `target` (`host:port`), resolving it if needed.
pub async fn connect(target: &str, timeout: Duration) -> Result<TcpStream, ConnectError> {
    match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY on upstream");
            }
            Ok(stream)
        }
        Ok(Err(source)) => Err(ConnectError::Io {
            target: target.to_string(),
            source,
        }),
        Err(_) => Err(ConnectError::Timeout {
            target: target.to_string(),
            timeout,
        }),
    }
}
