// ────────────────────────────────
// src/server/listener.rs
// Encapsulates low‑level TCP bind so callers get a typed Listen error.
// ────────────────────────────────
use crate::proxy::ProxyError;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub async fn bind_tcp(addr: SocketAddr) -> Result<TcpListener, ProxyError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ProxyError::Listen {
            address: addr,
            source,
        })
}
