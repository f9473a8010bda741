//! Probe worker against real local HTTP servers.

mod common;

use std::time::{Duration, Instant};

use pingwave_probe::{HyperTransport, ProbeError, TransportConfig, probe_once};

use common::{TestServer, closed_port_url, truncating_server};

fn transport() -> HyperTransport {
    HyperTransport::new(&TransportConfig::default()).unwrap()
}

#[tokio::test]
async fn status_codes_are_reported_without_error() {
    let server = TestServer::start().await;
    let transport = transport();

    for code in [200u16, 204, 302, 400, 404, 500] {
        let url = server.url(&format!("/status/{code}"));
        let result = probe_once(&transport, &url, Duration::from_secs(2)).await;

        assert_eq!(result.url(), url);
        assert_eq!(result.status_code(), code, "{url}");
        assert!(result.error().is_none(), "{url}: {:?}", result.error());

        let expected = if code == 204 { 0 } else { format!("status {code}\n").len() };
        assert_eq!(result.body().len(), expected, "{url}");
    }
}

#[tokio::test]
async fn body_length_matches_bytes_sent() {
    let server = TestServer::start().await;
    let transport = transport();

    for n in [0usize, 1, 13, 64 * 1024] {
        let result = probe_once(&transport, &server.url(&format!("/bytes/{n}")), Duration::from_secs(2)).await;
        assert!(result.error().is_none());
        assert_eq!(result.body().len(), n);
    }
}

#[tokio::test]
async fn slow_endpoint_fails_at_deadline() {
    let server = TestServer::start().await;
    let transport = transport();
    let started = Instant::now();

    let result = probe_once(&transport, &server.url("/slow/5000"), Duration::from_millis(100)).await;

    assert_eq!(result.status_code(), 0);
    assert_eq!(
        result.error(),
        Some(&ProbeError::DeadlineExceeded(Duration::from_millis(100)))
    );
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn refused_connection_is_transport_error() {
    let transport = transport();
    let result = probe_once(&transport, &closed_port_url().await, Duration::from_secs(2)).await;

    assert_eq!(result.status_code(), 0);
    assert!(matches!(result.error(), Some(ProbeError::Transport(_))), "{:?}", result.error());
}

#[tokio::test]
async fn truncated_body_keeps_status() {
    let transport = transport();
    let result = probe_once(&transport, &truncating_server().await, Duration::from_secs(2)).await;

    assert_eq!(result.status_code(), 200);
    assert!(matches!(result.error(), Some(ProbeError::Body(_))), "{:?}", result.error());
    assert!(result.body().is_empty());
}

#[tokio::test]
async fn malformed_url_is_invalid() {
    let transport = transport();
    let result = probe_once(&transport, "htp//broken", Duration::from_secs(1)).await;

    assert_eq!(result.status_code(), 0);
    assert!(matches!(result.error(), Some(ProbeError::InvalidUrl(_))));
}

#[tokio::test]
async fn transport_survives_close_idle() {
    use pingwave_probe::Transport;

    let server = TestServer::start().await;
    let transport = transport();

    let first = probe_once(&transport, &server.url("/"), Duration::from_secs(2)).await;
    transport.close_idle();
    let second = probe_once(&transport, &server.url("/"), Duration::from_secs(2)).await;

    assert_eq!(first.status_code(), 200);
    assert_eq!(second.status_code(), 200);
    assert_eq!(second.body().len(), "Hello, world!\n".len());
}
