// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON).
///
/// Keys missing from the file keep their defaults. The result is not
/// validated yet: CLI overrides are applied on top first.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(&contents).context("Failed to parse JSON config")?,
    };

    Ok(config)
}
