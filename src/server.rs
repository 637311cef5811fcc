//! Accept loop and shutdown sequencing.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::lifecycle::{drain, ShutdownSignal};
use crate::net::handler::{serve_connection, HandlerContext};
use crate::net::{ConnectionTracker, Listener};
use crate::stats::{StatsAggregator, TopNSnapshot};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) cannot spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The forward proxy: one listener, one fixed target, shared stats.
pub struct ProxyServer {
    config: Arc<ProxyConfig>,
    stats: StatsAggregator,
    tracker: ConnectionTracker,
}

impl ProxyServer {
    /// Create a server for a validated configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
            stats: StatsAggregator::new(),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Shared access counters. Clones observe the same counts.
    pub fn stats(&self) -> StatsAggregator {
        self.stats.clone()
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Accept connections until shutdown, then drain and report.
    ///
    /// The listener is closed as soon as shutdown is observed. In-flight
    /// connections get `timeouts.shutdown_grace_secs` to finish before the
    /// top-N snapshot is taken and returned.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownSignal) -> TopNSnapshot {
        let ctx = Arc::new(HandlerContext::from_config(
            &self.config,
            self.stats.clone(),
            shutdown.clone(),
        ));

        tracing::info!(
            listen = %self.config.listener.bind_address(),
            target = %self.config.target.address,
            block_pattern = self.config.policy.block_pattern.as_deref().unwrap_or("-"),
            inject_header = ?self.config.policy.inject_header.as_ref().map(ToString::to_string),
            "Proxy accepting connections"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = self.tracker.track();
                        tokio::spawn(serve_connection(stream, peer, permit, guard, Arc::clone(&ctx)));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        tracing::info!("Listener closed; no longer accepting connections");

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        drain(&self.tracker, grace).await;

        let snapshot = self.stats.snapshot(self.config.stats.top_n);
        tracing::info!(
            paths = self.stats.len(),
            requests = self.stats.total(),
            "Final access statistics collected"
        );
        snapshot
    }
}
