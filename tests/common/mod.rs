// tests/common/mod.rs
#![allow(dead_code)]

use hyper::{
    client::HttpConnector,
    header::HeaderValue,
    server::conn::AddrIncoming,
    service::{make_service_fn, service_fn},
    Body, Client, Request, Response, Server, StatusCode,
};
use proxy_healthz::{config::Config, health::HealthChecker};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

pub const PROXY_MARKER: &str = "x-proxy";

/// Starts a forward proxy that relays every absolute-form request verbatim
/// and tags the response with `X-Proxy: true`.
pub async fn spawn_mock_proxy() -> SocketAddr {
    spawn_mock_proxy_with_delay(Duration::ZERO).await
}

/// Like `spawn_mock_proxy`, but holds each upstream response for `delay`
/// before answering.
pub async fn spawn_mock_proxy_with_delay(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = Client::new();

    let make_svc = make_service_fn(move |_| {
        let client = client.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| forward(client.clone(), req, delay)))
        }
    });

    let server = Server::builder(AddrIncoming::from_listener(listener).unwrap()).serve(make_svc);
    tokio::spawn(server);

    addr
}

async fn forward(
    client: Client<HttpConnector>,
    req: Request<Body>,
    delay: Duration,
) -> Result<Response<Body>, Infallible> {
    match client.request(req).await {
        Ok(mut res) => {
            tokio::time::sleep(delay).await;
            res.headers_mut()
                .insert(PROXY_MARKER, HeaderValue::from_static("true"));
            Ok(res)
        }
        Err(_) => Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from("Error sending proxy request"))
            .unwrap()),
    }
}

/// Starts a proxy that accepts connections and never answers.
pub async fn spawn_silent_proxy() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn unused_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn config(proxy: SocketAddr, target_address: &str, target_path: &str) -> Config {
    Config {
        proxy_address: proxy.to_string(),
        target_address: target_address.to_string(),
        target_path: target_path.to_string(),
        probe_timeout_secs: 5,
        ..Config::default()
    }
}

pub fn checker(config: &Config) -> HealthChecker {
    HealthChecker::from_config(config, None).unwrap()
}

pub fn healthz_request() -> hyper::http::request::Parts {
    Request::get("/healthz").body(()).unwrap().into_parts().0
}

pub fn caller() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 50000))
}

pub async fn body_string(res: Response<Body>) -> String {
    let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Client that talks to the server under test directly, ignoring any
/// proxy settings from the environment.
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
