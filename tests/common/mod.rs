//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use relay_proxy::config::ProxyConfig;
use relay_proxy::lifecycle::Shutdown;
use relay_proxy::net::Listener;
use relay_proxy::{ProxyServer, StatsAggregator, TopNSnapshot};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Read an HTTP request head (up to the blank line) or until EOF.
pub async fn read_head(socket: &mut TcpStream) -> Vec<u8> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    head
}

/// Start a backend that answers every request with `body` and reports the
/// request heads it received.
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let _ = tx.send(head);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Start a backend that echoes everything back until the client closes.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.into_split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config for a proxy on an ephemeral local port with short timeouts.
pub fn test_config(target: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.ip = "127.0.0.1".into();
    config.listener.port = 0;
    config.target.address = target.to_string();
    config.timeouts.connect_secs = 2;
    config.timeouts.client_read_secs = 2;
    config.timeouts.relay_idle_secs = 2;
    config.timeouts.shutdown_grace_secs = 2;
    config.stats.report_path = None;
    config
}

/// A running proxy under test.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub stats: StatsAggregator,
    shutdown: Shutdown,
    handle: JoinHandle<TopNSnapshot>,
}

impl TestProxy {
    pub async fn start(config: ProxyConfig) -> Self {
        let listener = Listener::bind(&config.listener).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let server = ProxyServer::new(config);
        let stats = server.stats();
        let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

        Self {
            addr,
            stats,
            shutdown,
            handle,
        }
    }

    /// Trigger shutdown and wait for the final snapshot.
    pub async fn stop(self) -> TopNSnapshot {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("proxy did not shut down")
            .unwrap()
    }
}

/// Send raw bytes through the proxy and read until it closes the connection.
pub async fn send_request(proxy: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("proxy response timed out")
        .unwrap();
    response
}

pub fn get(path: &str) -> Vec<u8> {
    format!("GET {path} HTTP/1.1\r\nHost: httpbin.org\r\n\r\n").into_bytes()
}
