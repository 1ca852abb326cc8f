// src/server/handler.rs
use hyper::{Body, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::Service;

use crate::config::HEALTHZ_PATH;
use crate::health::HealthChecker;
use crate::proxy::plain_text;

/// Routes requests by exact path: `/healthz`, the target path, 404 otherwise.
#[derive(Clone)]
pub struct RequestHandler {
    checker: Arc<HealthChecker>,
    peer: SocketAddr,
}

impl RequestHandler {
    pub fn new(checker: Arc<HealthChecker>) -> Self {
        Self {
            checker,
            peer: SocketAddr::from(([0, 0, 0, 0], 0)),
        }
    }

    /// Copy of this handler that attributes requests to `peer`.
    pub fn for_peer(&self, peer: SocketAddr) -> Self {
        Self {
            checker: self.checker.clone(),
            peer,
        }
    }

    pub async fn route(&self, req: Request<Body>) -> Response<Body> {
        // Request bodies are never read.
        let (parts, _body) = req.into_parts();
        let path = parts.uri.path();

        if path == HEALTHZ_PATH {
            self.checker.healthz(&parts, self.peer).await
        } else if path == self.checker.target_path() {
            self.checker.target(&parts, self.peer)
        } else {
            plain_text(StatusCode::NOT_FOUND, "404 page not found\n")
        }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.route(req).await) })
    }
}
