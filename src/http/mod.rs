//! HTTP request-line handling.
//!
//! # Data Flow
//! ```text
//! first chunk from client
//!     → request.rs (locate and parse the request line)
//!     → intercept.rs (block decision, header injection)
//!     → response.rs (fixed 403 / 502 bodies)
//! ```
//!
//! # Design Decisions
//! - Only the request line is parsed; headers are scanned, never modelled
//! - Anything that is not a request line is opaque and passed through
//! - No chunking, keep-alive or HTTP/2 awareness

pub mod intercept;
pub mod request;
pub mod response;

pub use intercept::{intercept, Interception, Outcome};
pub use request::RequestLine;
pub use response::{BAD_GATEWAY_RESPONSE, BLOCKED_RESPONSE};
