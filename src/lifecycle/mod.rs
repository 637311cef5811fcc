//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     flag set → accept loop stops, listener closed
//!             → relay loops stop at their next read boundary
//!             → drain() waits out the grace period
//!             → stats snapshot handed to the report
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, report
//! - Shutdown has a deadline; connections are never force-killed mid-write

pub mod shutdown;
pub mod signals;

pub use shutdown::{drain, Shutdown, ShutdownSignal};
pub use signals::{shutdown_on_signal, wait_for_signal};
