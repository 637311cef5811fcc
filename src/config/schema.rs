//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// The single upstream every connection is forwarded to.
    pub target: TargetConfig,

    /// Request-line policy (blocking and header injection).
    pub policy: PolicyConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Relay engine tuning.
    pub relay: RelayConfig,

    /// Access statistics reporting.
    pub stats: StatsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// IP address to listen on (e.g., "0.0.0.0").
    pub ip: String,

    /// Port to listen on. Port 0 picks an ephemeral port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// The `ip:port` form used in logs.
    pub fn bind_address(&self) -> String {
        if self.ip.contains(':') {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
        }
    }
}

/// Upstream target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Target server in `host:port` form.
    pub address: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:80".to_string(),
        }
    }
}

/// Request-line policy applied to the first chunk of every connection.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Requests whose path contains this substring are answered with 403.
    pub block_pattern: Option<String>,

    /// Header inserted right after the request line of forwarded requests.
    pub inject_header: Option<InjectHeader>,
}

/// A `Name: Value` header to insert into forwarded requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct InjectHeader {
    name: String,
    value: String,
}

impl InjectHeader {
    /// Build a header from its parts. The name must be a non-empty token.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, InvalidHeader> {
        let name = name.into();
        let value = value.into();

        if name.is_empty() || !name.bytes().all(is_token_byte) {
            return Err(InvalidHeader::Name(name));
        }
        if value.bytes().any(|b| b == b'\r' || b == b'\n') {
            return Err(InvalidHeader::Value(value));
        }

        Ok(Self { name, value })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The header line as written on the wire, without the line terminator.
    pub fn line(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }
}

impl FromStr for InjectHeader {
    type Err = InvalidHeader;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once(':')
            .ok_or_else(|| InvalidHeader::MissingColon(s.to_string()))?;
        Self::new(name.trim(), value.trim())
    }
}

impl TryFrom<String> for InjectHeader {
    type Error = InvalidHeader;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<InjectHeader> for String {
    fn from(header: InjectHeader) -> Self {
        header.line()
    }
}

impl fmt::Display for InjectHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Error returned when an inject-header string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidHeader {
    #[error("header must be in 'Name: Value' form, got {0:?}")]
    MissingColon(String),

    #[error("invalid header name {0:?}")]
    Name(String),

    #[error("header value must not contain line breaks: {0:?}")]
    Value(String),
}

/// RFC 9110 token characters.
pub(crate) fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Timeout configuration for the blocking points of a connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connect timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for the client's first chunk in seconds.
    pub client_read_secs: u64,

    /// Per-read idle timeout while relaying, in seconds.
    pub relay_idle_secs: u64,

    /// How long shutdown waits for in-flight connections, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            client_read_secs: 10,
            relay_idle_secs: 30,
            shutdown_grace_secs: 5,
        }
    }
}

/// Relay engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Size of each read chunk in bytes.
    pub buffer_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { buffer_size: 4096 }
    }
}

/// Output format of the shutdown report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Access statistics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Number of paths included in the shutdown report.
    pub top_n: usize,

    /// File the shutdown report is written to. `None` disables the file.
    pub report_path: Option<String>,

    /// Report file format.
    pub format: ReportFormat,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            report_path: Some("logs/top_urls.log".to_string()),
            format: ReportFormat::Text,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
