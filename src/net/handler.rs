//! Per-connection orchestration.
//!
//! ```text
//! INIT → READING_PREAMBLE → BLOCKED ───────────────────────→ CLOSED
//!                         → CONNECTING_UPSTREAM → RELAYING → CLOSED
//!        READING_PREAMBLE | CONNECTING_UPSTREAM → ERROR
//! ```
//!
//! Every failure stays inside its connection: the handler writes what the
//! client should see (if anything), drops both sockets and returns.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::config::{PolicyConfig, ProxyConfig};
use crate::http::{intercept, Outcome, BAD_GATEWAY_RESPONSE};
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{Connection, ConnectionGuard, ConnectionState};
use crate::net::listener::ConnectionPermit;
use crate::net::relay::{relay, RelayOptions, RelayResult};
use crate::net::upstream::{self, ConnectError};
use crate::observability::metrics;
use crate::stats::StatsAggregator;

/// Everything a handler needs, shared by all connections.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub target: String,
    pub policy: PolicyConfig,
    pub connect_timeout: Duration,
    pub client_read_timeout: Duration,
    pub relay: RelayOptions,
    pub stats: StatsAggregator,
    pub shutdown: ShutdownSignal,
}

impl HandlerContext {
    pub fn from_config(config: &ProxyConfig, stats: StatsAggregator, shutdown: ShutdownSignal) -> Self {
        Self {
            target: config.target.address.clone(),
            policy: config.policy.clone(),
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            client_read_timeout: Duration::from_secs(config.timeouts.client_read_secs),
            relay: RelayOptions {
                buffer_size: config.relay.buffer_size,
                idle_timeout: Duration::from_secs(config.timeouts.relay_idle_secs),
            },
            stats,
            shutdown,
        }
    }
}

/// How a connection that did not fail ended.
#[derive(Debug)]
pub enum Disposition {
    /// Answered with 403.
    Blocked,
    /// Relayed to the upstream until one side closed.
    Relayed(RelayResult),
}

/// Ways a single connection can fail. None of them outlive the connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("client sent nothing within {0:?}")]
    ClientTimeout(Duration),

    #[error("client closed before sending any data")]
    ClientClosed,

    #[error("reading from client failed: {0}")]
    ClientIo(#[source] io::Error),

    #[error(transparent)]
    UpstreamConnect(#[from] ConnectError),

    #[error("forwarding request to upstream failed: {0}")]
    UpstreamWrite(#[source] io::Error),
}

/// Drive one client connection through its whole lifecycle.
///
/// `conn` ends in [`ConnectionState::Closed`] or [`ConnectionState::Error`].
pub async fn handle_connection<S>(
    mut client: S,
    conn: &mut Connection,
    ctx: &HandlerContext,
) -> Result<Disposition, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.transition(ConnectionState::ReadingPreamble);

    let mut buf = vec![0u8; ctx.relay.buffer_size];
    let n = match tokio::time::timeout(ctx.client_read_timeout, client.read(&mut buf)).await {
        Ok(Ok(0)) => return fail(conn, ConnectionError::ClientClosed),
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return fail(conn, ConnectionError::ClientIo(e)),
        Err(_) => return fail(conn, ConnectionError::ClientTimeout(ctx.client_read_timeout)),
    };

    let interception = intercept(&buf[..n], &ctx.policy);
    if let Some(path) = interception.path.as_deref() {
        tracing::info!(
            method = interception.method.as_deref().unwrap_or_default(),
            path,
            version = interception.version.as_deref().unwrap_or_default(),
            "Request"
        );
        ctx.stats.record(path);
        metrics::record_request(interception.method.as_deref().unwrap_or_default());
        conn.set_path(path.to_string());
    } else {
        tracing::debug!(bytes = n, "Preamble is not an HTTP request line; passing through");
    }

    let preamble = match interception.outcome {
        Outcome::Blocked(response) => {
            conn.transition(ConnectionState::Blocked);
            tracing::warn!(path = conn.path().unwrap_or_default(), "Blocked request");
            metrics::record_blocked();
            respond(&mut client, response).await;
            conn.transition(ConnectionState::Closed);
            return Ok(Disposition::Blocked);
        }
        Outcome::PassThrough(bytes) => bytes,
    };

    if interception.injected {
        if let Some(header) = &ctx.policy.inject_header {
            tracing::info!(header = %header, "Injected header");
            metrics::record_injected();
        }
    }

    conn.transition(ConnectionState::ConnectingUpstream);
    let mut upstream = match upstream::connect(&ctx.target, ctx.connect_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(target_addr = %ctx.target, error = %e, "Upstream connection failed");
            metrics::record_upstream_error(e.reason());
            respond(&mut client, BAD_GATEWAY_RESPONSE).await;
            return fail(conn, e.into());
        }
    };

    if let Err(e) = upstream.write_all(&preamble).await {
        return fail(conn, ConnectionError::UpstreamWrite(e));
    }

    conn.transition(ConnectionState::Relaying);
    let mut result = relay(client, upstream, &ctx.relay, &ctx.shutdown).await;
    result.a_to_b.bytes += preamble.len() as u64;
    conn.transition(ConnectionState::Closed);

    metrics::record_relayed_bytes("upstream", result.a_to_b.bytes);
    metrics::record_relayed_bytes("client", result.b_to_a.bytes);
    Ok(Disposition::Relayed(result))
}

fn fail(conn: &mut Connection, err: ConnectionError) -> Result<Disposition, ConnectionError> {
    conn.transition(ConnectionState::Error);
    Err(err)
}

/// Write a fixed response and close the client's write side.
async fn respond<S>(client: &mut S, response: &[u8])
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = client.write_all(response).await {
        tracing::debug!(error = %e, "Failed to write response to client");
        return;
    }
    if let Err(e) = client.shutdown().await {
        tracing::debug!(error = %e, "Failed to close client write side");
    }
}

/// Run a handler for an accepted socket inside its own span and log how it ended.
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    permit: ConnectionPermit,
    guard: ConnectionGuard,
    ctx: Arc<HandlerContext>,
) {
    let mut conn = Connection::new(guard.id(), peer);
    let span = tracing::info_span!("connection", id = %conn.id(), peer = %peer);

    async move {
        tracing::info!("Connection opened");

        let outcome = handle_connection(stream, &mut conn, &ctx).await;
        match &outcome {
            Ok(Disposition::Blocked) => {}
            Ok(Disposition::Relayed(result)) => {
                if let Some(status) = result.b_to_a.status_line.as_deref() {
                    tracing::info!(path = conn.path().unwrap_or_default(), status, "Response");
                }
                if result.had_error() {
                    tracing::debug!(
                        to_upstream = ?result.a_to_b.end,
                        to_client = ?result.b_to_a.end,
                        "Relay ended on I/O error"
                    );
                }
            }
            Err(ConnectionError::UpstreamConnect(_)) => {}
            Err(e) => tracing::debug!(error = %e, "Connection ended early"),
        }

        let (sent, received) = match &outcome {
            Ok(Disposition::Relayed(result)) => (result.a_to_b.bytes, result.b_to_a.bytes),
            _ => (0, 0),
        };
        metrics::record_connection_closed(conn.state());
        tracing::info!(state = %conn.state(), sent, received, "Connection closed");

        drop(guard);
        drop(permit);
    }
    .instrument(span)
    .await
}
