//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) and/or command-line flags
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable for the lifetime of the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    InjectHeader, InvalidHeader, ListenerConfig, ObservabilityConfig, PolicyConfig, ProxyConfig,
    RelayConfig, ReportFormat, StatsConfig, TargetConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
