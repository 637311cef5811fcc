//! relay-proxy: transparent forward proxy for plaintext HTTP.
//!
//! ```text
//! relay-proxy --ip 127.0.0.1 --port 8080 --server 54.1.2.3:80 \
//!     --block /ip --inject-header "X-Proxy-Header: LightLinksProxy"
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;

use relay_proxy::config::{read_config, validate_config, ConfigError, InjectHeader, ProxyConfig};
use relay_proxy::lifecycle::{shutdown_on_signal, Shutdown};
use relay_proxy::net::Listener;
use relay_proxy::observability::{logging, metrics};
use relay_proxy::stats::{log_snapshot, write_report};
use relay_proxy::ProxyServer;

#[derive(Parser, Debug)]
#[command(name = "relay-proxy", version)]
#[command(about = "Transparent forward proxy for plaintext HTTP", long_about = None)]
struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IP address to listen on
    #[arg(long)]
    ip: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Target server in 'host:port' format
    #[arg(long, required_unless_present = "config")]
    server: Option<String>,

    /// Block requests whose path contains this substring
    #[arg(long)]
    block: Option<String>,

    /// Header to insert into forwarded requests, as "Name: Value"
    #[arg(long)]
    inject_header: Option<InjectHeader>,

    /// Number of paths in the shutdown report
    #[arg(long)]
    top_n: Option<usize>,

    /// Where to write the shutdown report
    #[arg(long, conflicts_with = "no_report")]
    report: Option<String>,

    /// Do not write a report file
    #[arg(long)]
    no_report: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Merge the optional config file with the flags and validate the result.
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(ip) = self.ip {
            config.listener.ip = ip;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(server) = self.server {
            config.target.address = server;
        }
        if let Some(block) = self.block {
            config.policy.block_pattern = Some(block);
        }
        if let Some(header) = self.inject_header {
            config.policy.inject_header = Some(header);
        }
        if let Some(top_n) = self.top_n {
            config.stats.top_n = top_n;
        }
        if let Some(report) = self.report {
            config.stats.report_path = Some(report);
        }
        if self.no_report {
            config.stats.report_path = None;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("relay-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = Listener::bind(&config.listener).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        target = %config.target.address,
        "Listening and forwarding"
    );

    let shutdown = Shutdown::new();
    let server = ProxyServer::new(config.clone());
    let (snapshot, ()) = tokio::join!(
        server.run(listener, shutdown.subscribe()),
        shutdown_on_signal(&shutdown),
    );

    println!("\n{snapshot}");
    log_snapshot(&snapshot);
    if let Some(path) = &config.stats.report_path {
        if let Err(e) = write_report(&snapshot, Path::new(path), config.stats.format) {
            tracing::error!(error = %e, path = %path, "Failed to write access report");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_a_config() {
        let cli = Cli::parse_from([
            "relay-proxy",
            "--ip",
            "127.0.0.1",
            "--port",
            "9000",
            "--server",
            "54.1.2.3:80",
            "--block",
            "/ip",
            "--inject-header",
            "X-Proxy-Header: LightLinksProxy",
        ]);
        let config = cli.into_config().unwrap();

        assert_eq!(config.listener.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.target.address, "54.1.2.3:80");
        assert_eq!(config.policy.block_pattern.as_deref(), Some("/ip"));
        assert_eq!(
            config.policy.inject_header.map(|h| h.to_string()),
            Some("X-Proxy-Header: LightLinksProxy".to_string())
        );
    }

    #[test]
    fn server_is_required_without_config_file() {
        assert!(Cli::try_parse_from(["relay-proxy", "--port", "9000"]).is_err());
    }

    #[test]
    fn malformed_inject_header_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["relay-proxy", "--server", "a:1", "--inject-header", "nocolon"]).is_err());
    }

    #[test]
    fn invalid_target_fails_validation() {
        let cli = Cli::parse_from(["relay-proxy", "--server", "no-port"]);
        assert!(matches!(cli.into_config(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.toml");
        std::fs::write(
            &path,
            "[target]\naddress = \"10.0.0.1:80\"\n[stats]\ntop_n = 3\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "relay-proxy",
            "--config",
            path.to_str().unwrap(),
            "--top-n",
            "5",
            "--no-report",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.target.address, "10.0.0.1:80");
        assert_eq!(config.stats.top_n, 5);
        assert_eq!(config.stats.report_path, None);
    }
}
