//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track connection state (Init → ReadingPreamble → … → Closed | Error)
//! - Generate unique connection IDs for tracing
//! - Count live connections so shutdown can drain them

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, nothing read yet.
    Init,
    /// Waiting for the client's first chunk.
    ReadingPreamble,
    /// Answered with 403; upstream never contacted.
    Blocked,
    /// Opening the upstream connection.
    ConnectingUpstream,
    /// Bytes flowing in both directions.
    Relaying,
    /// Both sockets closed normally.
    Closed,
    /// Client timeout/disconnect or upstream failure.
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ReadingPreamble => "reading_preamble",
            Self::Blocked => "blocked",
            Self::ConnectingUpstream => "connecting_upstream",
            Self::Relaying => "relaying",
            Self::Closed => "closed",
            Self::Error => "error",
        }
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Init, ReadingPreamble)
                | (ReadingPreamble, Blocked)
                | (ReadingPreamble, ConnectingUpstream)
                | (ReadingPreamble, Error)
                | (Blocked, Closed)
                | (ConnectingUpstream, Relaying)
                | (ConnectingUpstream, Error)
                | (Relaying, Closed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-connection bookkeeping owned by its handler.
///
/// The sockets themselves live in the handler; this records what happened
/// to them.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    state: ConnectionState,
    path: Option<String>,
}

impl Connection {
    pub fn new(id: ConnectionId, peer: SocketAddr) -> Self {
        Self {
            id,
            peer,
            state: ConnectionState::Init,
            path: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Request path, if the preamble carried a request line.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = Some(path);
    }

    pub(crate) fn transition(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!(from = %self.state, to = %next, "Connection state");
        self.state = next;
    }
}

/// Tracks active connections for graceful shutdown.
///
/// The live count is published on a watch channel so shutdown can wait for
/// it to reach zero without polling.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<watch::Sender<u64>>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            active: Arc::new(tx),
        }
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active.send_modify(|n| *n += 1);
        metrics::record_connection_opened();
        ConnectionGuard {
            active: Arc::clone(&self.active),
            id: ConnectionId::new(),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        *self.active.borrow()
    }

    /// Wait until no connections are active.
    pub async fn wait_for_idle(&self) {
        let mut rx = self.active.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<watch::Sender<u64>>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.send_modify(|n| *n = n.saturating_sub(1));
        metrics::record_connection_released();
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}
