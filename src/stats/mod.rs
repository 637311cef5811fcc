//! Access statistics subsystem.
//!
//! # Data Flow
//! ```text
//! connection handlers (concurrently)
//!     → aggregator.rs record(path) under a mutex
//!
//! shutdown:
//!     → aggregator.rs snapshot(top_n) → TopNSnapshot
//!     → report.rs (log events, report file)
//! ```
//!
//! # Design Decisions
//! - One explicitly constructed aggregator, shared by clone; no global state
//! - Paths are counted raw, query strings included
//! - Ties rank by first-seen order

pub mod aggregator;
pub mod report;

pub use aggregator::{PathCount, StatsAggregator, TopNSnapshot};
pub use report::{log_snapshot, render, write_report, ReportError};
