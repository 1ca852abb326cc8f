// src/proxy/client.rs
use super::ProxyError;
use reqwest::{Client, Proxy, RequestBuilder};
use std::time::Duration;
use url::Url;

/// HTTP client pinned to a single forward proxy.
///
/// Built once at startup and shared by every healthz request; cloning only bumps the
/// reference count of the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    proxy_url: Url,
    authority: String,
}

impl ProxyClient {
    /// Builds a client routing all traffic through `http://<address>`.
    ///
    /// `address` is a bare `host:port` authority. `timeout` bounds a whole
    /// proxied request; `None` leaves it to the socket defaults.
    pub fn new(address: &str, timeout: Option<Duration>) -> Result<Self, ProxyError> {
        let proxy_url = parse_proxy_url(address)?;

        let proxy = Proxy::all(proxy_url.as_str()).map_err(|e| {
            ProxyError::Configuration(format!("invalid proxy address {address:?}: {e}"))
        })?;

        // An explicit proxy disables the HTTP(S)_PROXY environment lookup.
        let mut builder = Client::builder().proxy(proxy);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ProxyError::Configuration(format!("failed to build proxy client: {e}")))?;

        Ok(Self {
            client,
            proxy_url,
            authority: address.to_string(),
        })
    }

    pub fn proxy_url(&self) -> &Url {
        &self.proxy_url
    }

    /// `host:port` of the configured proxy, exactly as it was given.
    ///
    /// `proxy_url()` holds the normalized form (lowercase host, canonical IP,
    /// no leading zeros in the port).
    pub fn proxy_authority(&self) -> &str {
        &self.authority
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }
}

/// Parses a bare `host:port` into an `http://` URL, rejecting anything that
/// carries more than an authority.
pub fn parse_proxy_url(address: &str) -> Result<Url, ProxyError> {
    parse_authority(address).map_err(|reason| {
        ProxyError::Configuration(format!("invalid proxy address {address:?}: {reason}"))
    })
}

pub(crate) fn parse_authority(address: &str) -> Result<Url, String> {
    if address.is_empty() {
        return Err("address is empty".to_string());
    }
    let has_port = address.rsplit_once(':').is_some_and(|(host, port)| {
        !host.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
    });
    if !has_port {
        return Err("expected host:port with an explicit port".to_string());
    }

    let url = Url::parse(&format!("http://{address}")).map_err(|e| e.to_string())?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err("credentials are not supported".to_string());
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err("expected host:port without path".to_string());
    }

    Ok(url)
}
