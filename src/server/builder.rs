// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use crate::server::{handler::RequestHandler, listener::bind_tcp};
use anyhow::{anyhow, Result};
use hyper::server::conn::Http;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder pattern so `main.rs` can inject its handler and, in tests, a
/// listener that is already bound.
pub struct ServerBuilder {
    addr: SocketAddr,
    listener: Option<TcpListener>,
    handler: Option<RequestHandler>,
    drain_timeout: Duration,
}

impl ServerBuilder {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            listener: None,
            handler: None,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    /// Serve on an already bound listener instead of binding `addr`.
    pub fn with_listener(listener: TcpListener) -> Result<Self> {
        Ok(Self {
            addr: listener.local_addr()?,
            listener: Some(listener),
            handler: None,
            drain_timeout: DRAIN_TIMEOUT,
        })
    }

    pub fn with_handler(mut self, handler: RequestHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// How long `serve` waits for in-flight connections after shutdown.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Consume the builder, boot the TCP listener, spawn Hyper tasks until
    /// `shutdown` resolves.
    ///
    /// After `shutdown` the listener stops accepting, every open connection
    /// finishes its current request and closes, and `serve` returns once they
    /// are gone or the drain timeout expires. A bind failure comes back as
    /// `ProxyError::Listen`.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handler = self
            .handler
            .ok_or_else(|| anyhow!("handler must be set via with_handler()"))?;

        let listener = match self.listener {
            Some(listener) => listener,
            None => bind_tcp(self.addr).await?,
        };
        tracing::info!("HTTP server listening on {}", self.addr);

        let (drain_tx, drain_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        // Per-connection failures (e.g. EMFILE) must not stop the server.
                        tracing::warn!(%err, "accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => continue,
                _ = &mut shutdown => break,
            };
            let svc = handler.for_peer(peer);
            let mut drain = drain_rx.clone();

            // One Tokio task per connection.
            connections.spawn(async move {
                let conn = Http::new().serve_connection(stream, svc);
                tokio::pin!(conn);

                let result = tokio::select! {
                    result = conn.as_mut() => result,
                    _ = drain.changed() => {
                        conn.as_mut().graceful_shutdown();
                        conn.await
                    }
                };
                if let Err(err) = result {
                    tracing::warn!(%peer, %err, "connection error");
                }
            });
        }

        drop(listener);
        tracing::info!(
            connections = connections.len(),
            "Shutting down HTTP server, draining connections"
        );
        let _ = drain_tx.send(true);

        let drained = tokio::time::timeout(self.drain_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                remaining = connections.len(),
                "drain timeout expired, aborting connections"
            );
            connections.shutdown().await;
        }

        Ok(())
    }
}
