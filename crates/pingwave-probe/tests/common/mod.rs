//! Local HTTP fixtures for probe tests.
//!
//! Routes served by [`TestServer`]:
//! - `/status/{code}`: responds with `code`
//! - `/bytes/{n}`: 200 with exactly `n` body bytes
//! - `/slow/{ms}`: sleeps `ms` milliseconds, then 200
//! - anything else: 200 `Hello, world!`

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;

pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { break };
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let _ = http1::Builder::new()
                                .serve_connection(io, service_fn(route))
                                .await;
                        });
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        Self { addr, shutdown_tx }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    let mut parts = path.trim_start_matches('/').splitn(2, '/');
    let head = parts.next().unwrap_or_default();
    let arg = parts.next().unwrap_or_default();

    let (status, body) = match head {
        "status" => {
            let code: u16 = arg.parse().unwrap_or(400);
            let body = if code == 204 || code == 304 {
                Bytes::new()
            } else {
                Bytes::from(format!("status {code}\n"))
            };
            (code, body)
        }
        "bytes" => {
            let n: usize = arg.parse().unwrap_or(0);
            (200, Bytes::from(vec![b'x'; n]))
        }
        "slow" => {
            let ms: u64 = arg.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            (200, Bytes::from_static(b"slow\n"))
        }
        _ => (200, Bytes::from_static(b"Hello, world!\n")),
    };

    Ok(Response::builder()
        .status(status)
        .body(Full::new(body))
        .unwrap())
}

/// A server that promises a 100-byte body and hangs up after 5 bytes.
pub async fn truncating_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\nshort")
                    .await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}/")
}

/// A port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}
