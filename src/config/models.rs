// src/config/models.rs
use crate::proxy::{parse_authority, parse_proxy_url, ProxyError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

pub const HEALTHZ_PATH: &str = "/healthz";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub listen_address: SocketAddr,
    /// Forward proxy under test, as `host:port`.
    pub proxy_address: String,
    /// Where the proxy should reach this process, as `host:port`.
    pub target_address: String,
    pub target_path: String,
    pub log_level: LogLevel,
    /// Upper bound for one proxied healthz request; `0` disables the timeout.
    pub probe_timeout_secs: u64,
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            proxy_address: "127.0.0.1:3128".to_string(),
            target_address: "127.0.0.1:8080".to_string(),
            target_path: "/target".to_string(),
            log_level: LogLevel::default(),
            probe_timeout_secs: 10,
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ProxyError> {
        parse_proxy_url(&self.proxy_address)?;

        parse_authority(&self.target_address).map_err(|reason| {
            ProxyError::Configuration(format!(
                "invalid target address {:?}: {reason}",
                self.target_address
            ))
        })?;

        if !self.target_path.starts_with('/') {
            return Err(ProxyError::Configuration(format!(
                "target path {:?} must start with '/'",
                self.target_path
            )));
        }
        if self.target_path.contains(['?', '#']) {
            return Err(ProxyError::Configuration(format!(
                "target path {:?} must not carry a query or fragment",
                self.target_path
            )));
        }
        if self.target_path == HEALTHZ_PATH {
            return Err(ProxyError::Configuration(format!(
                "target path cannot be {HEALTHZ_PATH}"
            )));
        }

        if self.metrics.enabled {
            if !self.metrics.path.starts_with('/') {
                return Err(ProxyError::Configuration(format!(
                    "metrics path {:?} must start with '/'",
                    self.metrics.path
                )));
            }
            if self.metrics.address == self.listen_address {
                return Err(ProxyError::Configuration(
                    "metrics address must differ from the listen address".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// URL `/healthz` requests through the proxy.
    pub fn target_url(&self) -> Result<Url, ProxyError> {
        Url::parse(&format!("http://{}{}", self.target_address, self.target_path)).map_err(|e| {
            ProxyError::Configuration(format!(
                "invalid target {}{}: {e}",
                self.target_address, self.target_path
            ))
        })
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        match self.probe_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: SocketAddr,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: SocketAddr::from(([0, 0, 0, 0], 9090)),
            path: "/metrics".to_string(),
        }
    }
}
