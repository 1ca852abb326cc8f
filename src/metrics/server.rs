// src/metrics/server.rs
use super::MetricsRegistry;
use crate::server::listener::bind_tcp;
use anyhow::Result;
use hyper::{
    header,
    server::conn::AddrIncoming,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// Serves the prometheus text format on `path` in a background task and
/// returns the bound address.
pub async fn start_metrics_server(
    addr: SocketAddr,
    registry: Arc<MetricsRegistry>,
    path: String,
) -> Result<SocketAddr> {
    let listener = bind_tcp(addr).await?;
    let local_addr = listener.local_addr()?;
    let path = Arc::new(path);
    let service_path = path.clone();

    let make_service = make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move { Ok::<_, Infallible>(render(&req, &registry, &path)) }
            }))
        }
    });

    let server = Server::builder(AddrIncoming::from_listener(listener)?).serve(make_service);

    info!("Metrics server listening on http://{}{}", local_addr, path.as_str());

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(local_addr)
}

fn render(req: &Request<Body>, registry: &MetricsRegistry, path: &str) -> Response<Body> {
    if req.uri().path() != path {
        return status_only(StatusCode::NOT_FOUND, "Not Found");
    }

    match registry.gather() {
        Ok(metrics) => {
            let mut response = Response::new(Body::from(metrics));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            status_only(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn status_only(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}
