//! Shutdown coordination for the proxy.

use std::time::Duration;

use tokio::sync::watch;

use crate::net::connection::ConnectionTracker;

/// Coordinator for graceful shutdown.
///
/// Holds a watch flag that the accept loop, every relay loop and the drain
/// step observe. Triggering is idempotent.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::info!("Shutdown triggered");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Get the number of active subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested.
    ///
    /// Also resolves if the [`Shutdown`] was dropped without triggering,
    /// since nothing can trigger it any more.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

/// Wait up to `grace` for tracked connections to finish.
///
/// Returns the number of connections still open when the wait ended.
/// Connections are never cancelled here; their own socket timeouts end them.
pub async fn drain(tracker: &ConnectionTracker, grace: Duration) -> u64 {
    let active = tracker.active_count();
    if active == 0 {
        return 0;
    }

    tracing::info!(active, grace_secs = grace.as_secs_f64(), "Draining connections");
    match tokio::time::timeout(grace, tracker.wait_for_idle()).await {
        Ok(()) => {
            tracing::info!("All connections closed");
            0
        }
        Err(_) => {
            let remaining = tracker.active_count();
            tracing::warn!(remaining, "Grace period elapsed with connections still open");
            remaining
        }
    }
}
