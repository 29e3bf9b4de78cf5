//! Failure injection tests for the gateway.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use gateway_dispatch::config::{GatewayConfig, GatewaySection, RuleConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

fn single_rule(rule: RuleConfig) -> GatewayConfig {
    GatewayConfig {
        gateway: GatewaySection {
            rules: vec![rule],
            ..GatewaySection::default()
        },
        ..GatewayConfig::default()
    }
}

#[tokio::test]
async fn unreachable_backend_returns_502() {
    let dead = common::closed_port().await;
    let gateway = common::start_gateway(single_rule(common::rule("dead", "/*", &[dead]))).await;

    let res = common::client().get(gateway.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: serde_json::Value = serde_json::from_str(&res.text().await.unwrap()).unwrap();
    assert_eq!(body["status"], 502);
}

#[tokio::test]
async fn silent_backend_times_out_with_504() {
    let (backend, _open) = common::start_silent_backend().await;
    let mut rule = common::rule("slow", "/*", &[backend]);
    rule.timeout_ms = Some(200);
    let gateway = common::start_gateway(single_rule(rule)).await;

    let started = Instant::now();
    let res = common::client().get(gateway.url("/x")).send().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(res.status(), 504);
    assert!(elapsed >= Duration::from_millis(190), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "{elapsed:?}");
}

#[tokio::test]
async fn repeated_timeouts_leak_no_backend_sockets() {
    let (backend, open) = common::start_silent_backend().await;
    let mut rule = common::rule("slow", "/*", &[backend]);
    rule.timeout_ms = Some(100);
    let gateway = common::start_gateway(single_rule(rule)).await;
    let client = common::client();

    for _ in 0..10 {
        let res = client.get(gateway.url("/x")).send().await.unwrap();
        assert_eq!(res.status(), 504);
    }

    let released = common::eventually(Duration::from_secs(2), || open.load(Ordering::SeqCst) == 0).await;
    assert!(released, "{} backend connections still open", open.load(Ordering::SeqCst));
}

#[tokio::test]
async fn truncated_body_aborts_client_connection() {
    let backend = common::start_truncating_backend(100, "only-part").await;
    let gateway = common::start_gateway(single_rule(common::rule("trunc", "/*", &[backend]))).await;

    // Raw client so the abort is observable as a short read.
    let mut socket = TcpStream::connect(gateway.addr).await.unwrap();
    socket
        .write_all(b"GET /x HTTP/1.1\r\nHost: gw\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut received)).await;
    assert!(read.is_ok(), "client connection was left hanging");

    let text = String::from_utf8_lossy(&received);
    assert!(text.starts_with("HTTP/1.1 200"), "{text}");
    assert!(text.contains("content-length: 100"), "{text}");
    assert!(text.ends_with("only-part"), "{text}");
}

#[tokio::test]
async fn slow_body_is_cut_at_the_total_budget() {
    let backend = common::start_chunked_backend(
        vec!["one", "two", "three", "four"],
        Duration::from_millis(150),
    )
    .await;
    let mut rule = common::rule("stream", "/*", &[backend]);
    rule.timeout_ms = Some(250);
    let gateway = common::start_gateway(single_rule(rule)).await;

    let res = common::client().get(gateway.url("/x")).send().await.unwrap();
    // The head made it in time; the status stays what the backend said.
    assert_eq!(res.status(), 200);
    assert!(res.text().await.is_err());
}
