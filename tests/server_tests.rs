// tests/server_tests.rs
mod common;

use common::*;
use proxy_healthz::health::HealthChecker;
use proxy_healthz::metrics::{start_metrics_server, MetricsRegistry};
use proxy_healthz::proxy::ProxyError;
use proxy_healthz::server::{RequestHandler, ServerBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<anyhow::Result<()>>,
}

/// Serves a relay whose target is itself, like a real deployment.
async fn spawn_relay(proxy: SocketAddr, metrics: Option<Arc<MetricsRegistry>>) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = config(proxy, &addr.to_string(), "/target");
    let checker =
        HealthChecker::from_config(&config, metrics.map(|registry| registry.collector())).unwrap();

    let (shutdown, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(
        ServerBuilder::with_listener(listener)
            .unwrap()
            .with_handler(RequestHandler::new(Arc::new(checker)))
            .serve(async move {
                let _ = rx.await;
            }),
    );

    RunningServer {
        addr,
        shutdown,
        task,
    }
}

#[tokio::test]
async fn healthz_round_trips_through_proxy_to_own_target() {
    let proxy = spawn_mock_proxy().await;
    let server = spawn_relay(proxy, None).await;
    let client = direct_client();

    let res = client
        .get(format!("http://{}/healthz", server.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()[PROXY_MARKER], "true");
    assert_eq!(res.headers()["cache-control"], "no-store");
    assert_eq!(res.text().await.unwrap(), "success");
}

#[tokio::test]
async fn target_and_unknown_paths_are_served_directly() {
    let server = spawn_relay(unused_address().await, None).await;
    let client = direct_client();

    let res = client
        .post(format!("http://{}/target", server.addr))
        .body("ignored")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["cache-control"], "no-store");
    assert_eq!(res.text().await.unwrap(), "success");

    let res = client
        .get(format!("http://{}/missing", server.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn keeps_serving_after_proxy_failure() {
    let server = spawn_relay(unused_address().await, None).await;
    let client = direct_client();

    for _ in 0..2 {
        let res = client
            .get(format!("http://{}/healthz", server.addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 502);
        assert_eq!(res.text().await.unwrap(), "error connecting to /target");
    }

    let res = client
        .get(format!("http://{}/target", server.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn serve_returns_after_shutdown() {
    let server = spawn_relay(unused_address().await, None).await;

    server.shutdown.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn shutdown_lets_in_flight_healthz_finish() {
    let proxy = spawn_mock_proxy_with_delay(Duration::from_millis(500)).await;
    let server = spawn_relay(proxy, None).await;
    let url = format!("http://{}/healthz", server.addr);

    let request = tokio::spawn(async move {
        let res = direct_client().get(url).send().await.unwrap();
        (res.status(), res.text().await.unwrap())
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    server.shutdown.send(()).unwrap();

    let (status, body) = request.await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, "success");

    let result = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop after draining")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn drain_timeout_aborts_stuck_connections() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut config = config(spawn_silent_proxy().await, &addr.to_string(), "/target");
    config.probe_timeout_secs = 0;
    let checker = checker(&config);

    let (shutdown, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(
        ServerBuilder::with_listener(listener)
            .unwrap()
            .with_handler(RequestHandler::new(Arc::new(checker)))
            .with_drain_timeout(Duration::from_millis(200))
            .serve(async move {
                let _ = rx.await;
            }),
    );

    let url = format!("http://{addr}/healthz");
    let request = tokio::spawn(async move { direct_client().get(url).send().await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("stuck connection blocked shutdown")
        .unwrap();
    assert!(result.is_ok());
    assert!(request.await.unwrap().is_err());
}

#[tokio::test]
async fn serve_fails_when_address_is_taken() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();
    let checker = checker(&config(unused_address().await, "127.0.0.1:8080", "/target"));

    let err = ServerBuilder::new(addr)
        .with_handler(RequestHandler::new(Arc::new(checker)))
        .serve(std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ProxyError>(),
        Some(ProxyError::Listen { .. })
    ));
}

#[tokio::test]
async fn metrics_count_healthz_requests() {
    let registry = Arc::new(MetricsRegistry::new().unwrap());
    let metrics_addr = start_metrics_server(
        SocketAddr::from(([127, 0, 0, 1], 0)),
        registry.clone(),
        "/metrics".to_string(),
    )
    .await
    .unwrap();
    let proxy = spawn_mock_proxy().await;
    let server = spawn_relay(proxy, Some(registry)).await;
    let client = direct_client();

    let res = client
        .get(format!("http://{}/healthz", server.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let text = client
        .get(format!("http://{}/metrics", metrics_addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains(r#"healthz_probes_total{outcome="relayed"} 1"#));
    assert!(text.contains("healthz_target_requests_total 1"));

    let res = client
        .get(format!("http://{}/other", metrics_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
