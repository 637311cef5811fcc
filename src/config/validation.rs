//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listen ip {0:?} is not a valid IP address")]
    ListenIp(String),

    #[error("target {0:?} must be in 'host:port' format")]
    TargetFormat(String),

    #[error("block pattern must not be empty")]
    EmptyBlockPattern,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("metrics address {0:?} is not a valid socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.ip.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::ListenIp(config.listener.ip.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }

    if split_host_port(&config.target.address).is_none() {
        errors.push(ValidationError::TargetFormat(config.target.address.clone()));
    }

    if config.policy.block_pattern.as_deref() == Some("") {
        errors.push(ValidationError::EmptyBlockPattern);
    }

    let timeouts = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.client_read_secs", config.timeouts.client_read_secs),
        ("timeouts.relay_idle_secs", config.timeouts.relay_idle_secs),
        ("timeouts.shutdown_grace_secs", config.timeouts.shutdown_grace_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.relay.buffer_size == 0 {
        errors.push(ValidationError::Zero("relay.buffer_size"));
    }
    if config.stats.top_n == 0 {
        errors.push(ValidationError::Zero("stats.top_n"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Split `host:port`, requiring a non-empty host and a numeric port.
pub fn split_host_port(address: &str) -> Option<(&str, u16)> {
    let (host, port) = address.rsplit_once(':')?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    let port = port.parse().ok()?;
    Some((host, port))
}
