//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use queue_gateway::config::schema::{DEPARTMENT_SERVICE, USER_SERVICE};
use queue_gateway::{GatewayConfig, HttpServer, Shutdown};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

/// What a mock upstream saw.
#[derive(Debug)]
pub struct Recorded {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct BackendCtx {
    label: &'static str,
    delay: Duration,
    tx: mpsc::UnboundedSender<Recorded>,
}

/// Start a mock upstream that records every request it receives, waits
/// `delay`, then answers with JSON naming itself. `?status=NNN` picks the
/// response status.
pub async fn start_recording_backend(
    label: &'static str,
    delay: Duration,
) -> (SocketAddr, mpsc::UnboundedReceiver<Recorded>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .fallback(record)
        .with_state(BackendCtx { label, delay, tx });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, rx)
}

async fn record(State(ctx): State<BackendCtx>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();

    let _ = ctx.tx.send(Recorded {
        method: parts.method.clone(),
        path_and_query,
        headers: parts.headers.clone(),
        body,
    });

    tokio::time::sleep(ctx.delay).await;

    let status = parts
        .uri
        .query()
        .and_then(|q| q.strip_prefix("status="))
        .and_then(|s| s.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    (
        status,
        [("x-upstream", ctx.label), ("set-cookie", "upstream=1; HttpOnly")],
        Json(serde_json::json!({
            "service": ctx.label,
            "path": parts.uri.path(),
        })),
    )
        .into_response()
}

/// An upstream that accepts one connection, reads whatever arrives and
/// never answers. The receiver fires once the gateway closes that
/// connection.
pub async fn start_stalled_backend() -> (SocketAddr, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut buf = [0u8; 4096];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = closed_tx.send(());
    });

    (addr, closed_rx)
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Stock routes pointed at the given user and department upstreams.
pub fn gateway_config(user: SocketAddr, department: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.cors.allowed_origin = "http://localhost:5173".into();
    for route in &mut config.routes {
        if route.name == USER_SERVICE {
            route.upstream = format!("http://{}", user);
        } else if route.name == DEPARTMENT_SERVICE {
            route.upstream = format!("http://{}", department);
        }
    }
    config
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
