// src/proxy/error.rs
use hyper::{header, Body, Response, StatusCode};
use std::net::SocketAddr;

/// Errors raised while building, serving or relaying the proxied healthz request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("error connecting to {path}: {source}")]
    UpstreamConnect {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to listen on {address}: {source}")]
    Listen {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamConnect { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::Configuration(_) | ProxyError::Listen { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Only the failed path is exposed to the caller, never the transport detail.
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let status = err.status_code();
        let message = match err {
            ProxyError::UpstreamConnect { path, .. } => format!("error connecting to {path}"),
            _ => "internal server error".to_string(),
        };

        plain_text(status, message)
    }
}

pub(crate) fn plain_text(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
