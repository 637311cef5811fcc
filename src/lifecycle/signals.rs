//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT / SIGTERM (Ctrl-C elsewhere)
//! - Translate the first one into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The core never sees signals, only the shutdown flag

use crate::lifecycle::Shutdown;

/// Resolve when the process is asked to terminate.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

/// Resolve when the process is asked to terminate.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

/// Trigger `shutdown` on the first termination signal.
pub async fn shutdown_on_signal(shutdown: &Shutdown) {
    match wait_for_signal().await {
        Ok(name) => tracing::info!(signal = name, "Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to install signal handler; shutting down"),
    }
    shutdown.trigger();
}
