// src/health/checker.rs
use crate::config::Config;
use crate::metrics::{MetricsCollector, ProbeOutcome, Timer};
use crate::proxy::{plain_text, relay, ProxyClient, ProxyError};
use hyper::{header, http::request::Parts, Body, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

pub const TARGET_BODY: &str = "success";

/// Serves both ends of the proxied round trip.
///
/// `healthz` asks the forward proxy for `target_url`; the proxy is expected
/// to reach this same process, where `target` answers. Holds no per-request
/// state, so one instance is shared by every connection.
pub struct HealthChecker {
    client: ProxyClient,
    target_url: Url,
    target_path: String,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthChecker {
    pub fn new(
        config: &Config,
        client: ProxyClient,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Result<Self, ProxyError> {
        Ok(Self {
            client,
            target_url: config.target_url()?,
            target_path: config.target_path.clone(),
            metrics,
        })
    }

    /// Builds the proxy client from `config` as well.
    pub fn from_config(
        config: &Config,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Result<Self, ProxyError> {
        let client = ProxyClient::new(&config.proxy_address, config.probe_timeout())?;
        Self::new(config, client, metrics)
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    /// Requests the target through the proxy and relays the answer.
    ///
    /// Any upstream status is passed through; only a transport failure turns
    /// into a 502.
    pub async fn healthz(&self, req: &Parts, peer: SocketAddr) -> Response<Body> {
        debug!(caller = %peer, method = %req.method, url = %req.uri, "healthz");

        let timer = Timer::new();
        match self.client.get(self.target_url.clone()).send().await {
            Ok(upstream) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_probe(ProbeOutcome::Relayed, timer.elapsed());
                    metrics.record_upstream_status(upstream.status().as_u16());
                }
                relay::relay_response(upstream)
            }
            Err(source) => {
                let err = ProxyError::UpstreamConnect {
                    path: self.target_path.clone(),
                    source,
                };
                error!(
                    proxy = %self.client.proxy_authority(),
                    target = %self.target_url,
                    "{}",
                    err
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_probe(ProbeOutcome::UpstreamError, timer.elapsed());
                }
                err.into()
            }
        }
    }

    /// Always answers 200 `success`, uncacheable so the proxy cannot serve
    /// a stale copy.
    pub fn target(&self, req: &Parts, peer: SocketAddr) -> Response<Body> {
        debug!(caller = %peer, method = %req.method, path = %req.uri.path(), "target");

        if let Some(metrics) = &self.metrics {
            metrics.record_target_request();
        }

        let mut response = plain_text(StatusCode::OK, TARGET_BODY);
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        );
        response
    }
}
