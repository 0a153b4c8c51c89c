//! In-process stand-in for an Eagle's local API.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Basic-auth header for `0077dd:6e61a3a94882eef9`.
pub const EXPECTED_AUTH: &str = "Basic MDA3N2RkOjZlNjFhM2E5NDg4MmVlZjk=";
pub const USER: &str = "0077dd";
pub const PASSWORD: &str = "6e61a3a94882eef9";
pub const MAC: &str = "0xd8d5b90000001234";

/// A request the fake device received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Debug)]
struct Inner {
    status: StatusCode,
    body: String,
    delay: Duration,
    requests: Vec<RecordedRequest>,
}

/// Handle to a running fake device.
#[derive(Debug, Clone)]
pub struct FakeEagle {
    inner: Arc<Mutex<Inner>>,
    pub addr: SocketAddr,
}

impl FakeEagle {
    /// Starts a device that answers every request with `status` and `body`.
    pub async fn start(status: StatusCode, body: &str) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
            requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/cgi-bin/cgi_manager", post(cgi_manager))
            .with_state(inner.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { inner, addr }
    }

    /// The value to configure as the exporter's `eagle_host`.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn respond_with(&self, status: StatusCode, body: &str) {
        let mut inner = self.inner.lock();
        inner.status = status;
        inner.body = body.to_string();
    }

    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().delay = delay;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().requests.clone()
    }
}

async fn cgi_manager(
    State(inner): State<Arc<Mutex<Inner>>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (status, response, delay) = {
        let mut inner = inner.lock();
        inner.requests.push(RecordedRequest {
            authorization: authorization.clone(),
            body,
        });
        (inner.status, inner.body.clone(), inner.delay)
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    if authorization.as_deref() != Some(EXPECTED_AUTH) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string());
    }
    (status, response)
}

/// Starts a one-shot device that sends `head` followed by `body` and then
/// closes the connection, whatever the head's `Content-Length` promised.
pub async fn raw_reply(head: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !String::from_utf8_lossy(&request).ends_with("</LocalCommand>\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(head.as_bytes()).await.unwrap();
        stream.write_all(body.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    });
    addr
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
