use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HedgeConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    parse_config(&content)
}

/// Parse configuration text after environment variable substitution.
pub fn parse_config(content: &str) -> Result<HedgeConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: HedgeConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!(asset = %config.venue.asset, backend = %config.store.backend, "Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> HedgeConfig {
    HedgeConfig {
        venue: VenueConfig {
            client_id: Some("${DERIBIT_CLIENT_ID}".to_string()),
            client_secret: Some("${DERIBIT_CLIENT_SECRET}".to_string()),
            ..VenueConfig::default()
        },
        store: StoreConfig {
            backend: "redis".to_string(),
            redis_url: Some("${REDIS_URL}".to_string()),
            ..StoreConfig::default()
        },
        ..HedgeConfig::default()
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &HedgeConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}
