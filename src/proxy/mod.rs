// src/proxy/mod.rs
mod client;
mod error;
pub mod relay;

pub use client::{parse_proxy_url, ProxyClient};
pub(crate) use client::parse_authority;
pub use error::ProxyError;
pub(crate) use error::plain_text;
