//! Transparent forward proxy for plaintext HTTP.
//!
//! Accepts client connections, opens a matching connection to one fixed
//! upstream, optionally blocks or rewrites the first request line, relays
//! bytes in both directions and counts request paths for a shutdown report.
//!
//! ```text
//!   client ──▶ net::listener ──▶ net::handler ──▶ http::intercept ──▶ 403
//!                                     │
//!                                     ├──▶ net::upstream ──▶ 502
//!                                     │
//!                                     └──▶ net::relay ◀──▶ upstream target
//!
//!   net::handler ──▶ stats::aggregator ──(shutdown)──▶ stats::report
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;
pub mod stats;

pub use config::ProxyConfig;
pub use lifecycle::Shutdown;
pub use server::ProxyServer;
pub use stats::{StatsAggregator, TopNSnapshot};
