//! Integration tests for the HTTP server: proxying, health, and shutdown.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::header;
use axum::Router;

use sqlrouter::config::model::ProxyConfig;
use sqlrouter::health::HealthResponse;
use sqlrouter::proxy::ProxyStage;
use sqlrouter::router::HostRouter;
use sqlrouter::server::{self, AppState, HEALTH_PATH};
use sqlrouter::store::{Resolver, StoreSettings};

use common::{create_store, QUERY};

struct TestServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: tokio::sync::oneshot::Sender<()>,
    _dir: tempfile::TempDir,
}

async fn echo(req: Request) -> String {
    let forwarded_host = req
        .headers()
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    format!("{} {} via {forwarded_host}", req.method(), req.uri())
}

async fn start_backend() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new().fallback(echo))
            .await
            .unwrap();
    });
    addr
}

async fn start_test_server() -> TestServer {
    let backend = start_backend().await;

    let dir = tempfile::tempdir().unwrap();
    let path = create_store(
        dir.path(),
        &[
            ("app1", "127.0.0.1", i64::from(backend.port())),
            ("dead", "127.0.0.1", 1),
        ],
    )
    .await;
    let resolver = Resolver::provision(&StoreSettings::new(path, QUERY))
        .await
        .unwrap();

    let stage = ProxyStage::new(server::build_http_client(), ProxyConfig::default());
    let router = HostRouter::new(Arc::new(resolver), Arc::new(stage));
    let state = Arc::new(AppState::new(router));
    let app = server::build_router(Arc::clone(&state), 1_048_576);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    TestServer {
        addr,
        state,
        shutdown,
        _dir: dir,
    }
}

async fn get_with_host(addr: SocketAddr, host: &str, path: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("http://{addr}{path}"))
        .header(header::HOST, host)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn routed_request_is_proxied() {
    let server = start_test_server().await;

    let resp = get_with_host(server.addr, "app1.localhost", "/hello?name=x").await;
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key("x-correlation-id"));
    assert_eq!(
        resp.text().await.unwrap(),
        "GET /hello?name=x via app1.localhost"
    );

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn unknown_key_returns_404() {
    let server = start_test_server().await;

    let resp = get_with_host(server.addr, "app3.localhost", "/").await;
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "Not found");

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn single_label_host_returns_400() {
    let server = start_test_server().await;

    let resp = get_with_host(server.addr, "localhost", "/").await;
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "Invalid host");

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn unreachable_upstream_returns_502() {
    let server = start_test_server().await;

    let resp = get_with_host(server.addr, "dead.localhost", "/").await;
    assert_eq!(resp.status(), 502);
    assert_eq!(resp.text().await.unwrap(), "Upstream error");

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn health_endpoint_reports_store_and_stats() {
    let server = start_test_server().await;

    get_with_host(server.addr, "app1.localhost", "/").await;
    get_with_host(server.addr, "app3.localhost", "/").await;

    let url = format!("http://{}{HEALTH_PATH}", server.addr);
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 200);

    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert!(health.store.open);
    assert!(health.store.connections >= 1);
    assert_eq!(health.stats.routed, 1);
    assert_eq!(health.stats.not_found, 1);

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn closed_store_degrades_health_and_routing() {
    let server = start_test_server().await;
    server.state.router.resolver().close_store().await;

    let url = format!("http://{}{HEALTH_PATH}", server.addr);
    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), 503);
    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "degraded");
    assert!(!health.store.open);

    let resp = get_with_host(server.addr, "app1.localhost", "/").await;
    assert_eq!(resp.status(), 502);
    assert_eq!(resp.text().await.unwrap(), "Database error");

    let _ = server.shutdown.send(());
}

#[tokio::test]
async fn graceful_shutdown_works() {
    let server = start_test_server().await;

    let url = format!("http://{}{HEALTH_PATH}", server.addr);
    assert!(reqwest::get(&url).await.is_ok());

    let _ = server.shutdown.send(());
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert!(reqwest::get(&url).await.is_err());
}
