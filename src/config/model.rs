//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Every field has a sensible default so the client works out of the box
//! against a backend on `localhost:5002`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Refetch intervals for polled queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_dashboard_secs")]
    pub dashboard_secs: u64,
    #[serde(default = "default_notifications_secs")]
    pub notifications_secs: u64,
}

impl PollingConfig {
    pub fn dashboard(&self) -> Duration {
        Duration::from_secs(self.dashboard_secs.max(1))
    }

    pub fn notifications(&self) -> Duration {
        Duration::from_secs(self.notifications_secs.max(1))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            dashboard_secs: default_dashboard_secs(),
            notifications_secs: default_notifications_secs(),
        }
    }
}

/// Where the signed-in session is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_file: default_session_file(),
        }
    }
}

/// Feedback report export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
        }
    }
}

/// Diagnostic log file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            log_dir: default_log_dir(),
        }
    }
}

/// UI appearance and behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5002/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_dashboard_secs() -> u64 {
    30
}
fn default_notifications_secs() -> u64 {
    10
}
fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("peerfeed")
        .join("session.json")
}
fn default_download_dir() -> PathBuf {
    PathBuf::from("./exports")
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_dir() -> String {
    "~/.local/share/peerfeed/logs".to_string()
}
fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}
fn default_tick_ms() -> u64 {
    250
}
