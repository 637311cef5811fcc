//! Failure injection tests for the forward proxy.

use std::time::Duration;

use relay_proxy::http::BAD_GATEWAY_RESPONSE;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;
use common::{dead_address, get, send_request, start_mock_backend, test_config, TestProxy};

#[tokio::test]
async fn unreachable_target_yields_502_and_listener_survives() {
    let proxy = TestProxy::start(test_config(dead_address().await)).await;

    for _ in 0..3 {
        let response = send_request(proxy.addr, &get("/get")).await;
        assert_eq!(response, BAD_GATEWAY_RESPONSE);
    }
    let response = send_request(proxy.addr, &get("/status/200")).await;
    assert_eq!(response, BAD_GATEWAY_RESPONSE);

    let snapshot = proxy.stop().await;
    let rows: Vec<_> = snapshot.iter().map(|e| (e.path.as_str(), e.count)).collect();
    assert_eq!(rows, vec![("/get", 3), ("/status/200", 1)]);
}

#[tokio::test]
async fn silent_client_is_dropped_without_counting() {
    let (backend, _seen) = start_mock_backend("ok").await;
    let mut config = test_config(backend);
    config.timeouts.client_read_secs = 1;
    let proxy = TestProxy::start(config).await;

    let mut silent = TcpStream::connect(proxy.addr).await.unwrap();
    let mut buf = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(5), silent.read_to_end(&mut buf))
        .await
        .expect("proxy kept a silent client open")
        .unwrap_or(0);
    assert_eq!(n, 0);

    // The proxy still serves others.
    let response = send_request(proxy.addr, &get("/get")).await;
    assert!(response.starts_with(b"HTTP/1.1 200 OK"));

    let snapshot = proxy.stop().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(proxy_count(&snapshot, "/get"), 1);
}

#[tokio::test]
async fn client_disconnect_mid_relay_does_not_affect_others() {
    let (backend, _seen) = start_mock_backend("ok").await;
    let proxy = TestProxy::start(test_config(backend)).await;

    let mut quitter = TcpStream::connect(proxy.addr).await.unwrap();
    quitter.write_all(&get("/quit")).await.unwrap();
    drop(quitter);

    let response = send_request(proxy.addr, &get("/stay")).await;
    assert!(response.ends_with(b"ok"));

    let snapshot = proxy.stop().await;
    assert_eq!(proxy_count(&snapshot, "/stay"), 1);
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let (backend, _seen) = start_mock_backend("ok").await;
    let proxy = TestProxy::start(test_config(backend)).await;
    let addr = proxy.addr;

    send_request(addr, &get("/before")).await;
    let snapshot = proxy.stop().await;
    assert_eq!(proxy_count(&snapshot, "/before"), 1);

    assert!(TcpStream::connect(addr).await.is_err());
}

fn proxy_count(snapshot: &relay_proxy::TopNSnapshot, path: &str) -> u64 {
    snapshot
        .iter()
        .find(|e| e.path == path)
        .map_or(0, |e| e.count)
}
