//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limit)
//!     → connection.rs (id, state machine, live-connection tracking)
//!     → handler.rs (preamble read, interception, stats)
//!     → upstream.rs (bounded connect to the fixed target)
//!     → relay.rs (byte-transparent copy in both directions)
//! ```
//!
//! # Design Decisions
//! - One task per connection; the two relay directions are joined futures
//! - Every blocking read and the connect carry a timeout
//! - Errors end one connection, never the accept loop

pub mod connection;
pub mod handler;
pub mod listener;
pub mod relay;
pub mod upstream;

pub use connection::{Connection, ConnectionGuard, ConnectionId, ConnectionState, ConnectionTracker};
pub use handler::{handle_connection, serve_connection, ConnectionError, Disposition, HandlerContext};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use relay::{relay, Pump, PumpEnd, RelayOptions, RelayResult};
pub use upstream::{connect, ConnectError};
