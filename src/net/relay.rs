//! Bidirectional byte relay.
//!
//! Two copy loops run concurrently inside the connection's task, one per
//! direction. Each reads a bounded chunk with an idle timeout and writes it
//! unmodified to the peer, and a write that makes no progress for the same
//! idle timeout ends the direction too. A clean EOF is forwarded as a
//! half-close so the other direction can keep draining the response. Any
//! other stop tells the opposite loop, which then stops at its next read.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::http::response::status_line;
use crate::lifecycle::ShutdownSignal;

/// Tuning for one relay.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Bytes read per chunk.
    pub buffer_size: usize,
    /// A read that yields nothing, or a write that cannot complete, for this
    /// long ends the direction.
    pub idle_timeout: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Why one direction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpEnd {
    /// The source closed cleanly.
    Eof,
    /// The opposite direction failed or timed out first.
    PeerClosed,
    /// No bytes within the idle timeout.
    IdleTimeout,
    /// The destination did not accept a chunk within the idle timeout.
    WriteTimeout,
    /// Shutdown was observed between reads.
    Shutdown,
    ReadError(io::ErrorKind),
    WriteError(io::ErrorKind),
}

impl PumpEnd {
    pub fn is_error(&self) -> bool {
        matches!(self, PumpEnd::ReadError(_) | PumpEnd::WriteError(_))
    }
}

/// Outcome of one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pump {
    /// Bytes written to the destination.
    pub bytes: u64,
    /// Status line of the first chunk, when it looked like an HTTP response.
    pub status_line: Option<String>,
    pub end: PumpEnd,
}

/// Outcome of a whole relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResult {
    pub a_to_b: Pump,
    pub b_to_a: Pump,
}

impl RelayResult {
    pub fn total_bytes(&self) -> u64 {
        self.a_to_b.bytes + self.b_to_a.bytes
    }

    /// True if either direction ended on an I/O error.
    pub fn had_error(&self) -> bool {
        self.a_to_b.end.is_error() || self.b_to_a.end.is_error()
    }
}

/// Relay bytes between `a` and `b` until both directions have stopped.
///
/// Both streams are dropped, and therefore closed, before this returns.
pub async fn relay<A, B>(a: A, b: B, options: &RelayOptions, shutdown: &ShutdownSignal) -> RelayResult
where
    A: AsyncRead + AsyncWrite,
    B: AsyncRead + AsyncWrite,
{
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);

    let (a_done_tx, a_done_rx) = watch::channel(false);
    let (b_done_tx, b_done_rx) = watch::channel(false);

    let (a_to_b, b_to_a) = tokio::join!(
        pump(a_read, b_write, options, shutdown, a_done_tx, b_done_rx),
        pump(b_read, a_write, options, shutdown, b_done_tx, a_done_rx),
    );

    RelayResult { a_to_b, b_to_a }
}

async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    options: &RelayOptions,
    shutdown: &ShutdownSignal,
    done: watch::Sender<bool>,
    mut peer_done: watch::Receiver<bool>,
) -> Pump
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; options.buffer_size];
    let mut bytes = 0u64;
    let mut status = None;

    let end = loop {
        if shutdown.is_triggered() {
            break PumpEnd::Shutdown;
        }

        let n = tokio::select! {
            biased;
            res = tokio::time::timeout(options.idle_timeout, reader.read(&mut buf)) => match res {
                Ok(Ok(0)) => break PumpEnd::Eof,
                Ok(Ok(n)) => n,
                Ok(Err(e)) => break PumpEnd::ReadError(e.kind()),
                Err(_) => break PumpEnd::IdleTimeout,
            },
            // A peer that ended on EOF drops its sender without signalling.
            Ok(_) = peer_done.wait_for(|done| *done) => break PumpEnd::PeerClosed,
        };

        if bytes == 0 {
            status = status_line(&buf[..n]).map(str::to_string);
        }

        match tokio::time::timeout(options.idle_timeout, writer.write_all(&buf[..n])).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => break PumpEnd::WriteError(e.kind()),
            Err(_) => break PumpEnd::WriteTimeout,
        }
        bytes += n as u64;
    };

    if end == PumpEnd::Eof {
        // Half-close only; the opposite direction keeps running until its own
        // source closes or times out.
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(error = %e, "Failed to forward half-close");
        }
    } else {
        let _ = done.send(true);
    }

    Pump {
        bytes,
        status_line: status,
        end,
    }
}
