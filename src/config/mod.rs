pub mod model;

use anyhow::{Context, Result};
use std::path::PathBuf;

pub use model::{ApiConfig, AppConfig, LoggingConfig, PollingConfig};

/// Environment override for `[api] base_url`.
pub const API_URL_ENV: &str = "PEERFEED_API_URL";

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("peerfeed")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    let path = config_path();
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config file")?
    } else {
        AppConfig::default()
    };
    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            config.api.base_url = url.trim().to_string();
        }
    }
    Ok(config)
}

/// Write a default config file on first launch so users have something to
/// edit. Returns whether a file was written.
pub fn write_default_if_missing() -> Result<bool> {
    if config_path().exists() {
        return Ok(false);
    }
    save_config(&AppConfig::default())?;
    Ok(true)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).with_context(|| "Failed to serialize config")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}
