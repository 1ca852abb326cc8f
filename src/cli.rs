// src/cli.rs
use crate::config::{Config, LogLevel};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Health check relay for a forward proxy.
///
/// `/healthz` requests the local target path through the proxy and mirrors
/// whatever comes back.
#[derive(Debug, Parser)]
#[command(name = "proxy-healthz", version)]
pub struct Cli {
    /// YAML or JSON config file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on [default: 0.0.0.0:8080]
    #[arg(long)]
    pub listen_address: Option<SocketAddr>,

    /// Address of the forward proxy, host:port [default: 127.0.0.1:3128]
    #[arg(long)]
    pub proxy_address: Option<String>,

    /// Address of the proxied health check target, host:port [default: 127.0.0.1:8080]
    #[arg(long)]
    pub target_address: Option<String>,

    /// Path of the proxied health check target [default: /target]
    #[arg(long)]
    pub target_path: Option<String>,

    /// Log level, overridden by RUST_LOG [default: warn]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Timeout for one proxied healthz request in seconds, 0 disables it [default: 10]
    #[arg(long)]
    pub probe_timeout_secs: Option<u64>,

    /// Serve prometheus metrics on this address
    #[arg(long)]
    pub metrics_address: Option<SocketAddr>,
}

impl Cli {
    /// Applies every flag that was given on top of `config`.
    pub fn apply(self, config: &mut Config) {
        if let Some(addr) = self.listen_address {
            config.listen_address = addr;
        }
        if let Some(addr) = self.proxy_address {
            config.proxy_address = addr;
        }
        if let Some(addr) = self.target_address {
            config.target_address = addr;
        }
        if let Some(path) = self.target_path {
            config.target_path = path;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(secs) = self.probe_timeout_secs {
            config.probe_timeout_secs = secs;
        }
        if let Some(addr) = self.metrics_address {
            config.metrics.enabled = true;
            config.metrics.address = addr;
        }
    }
}
