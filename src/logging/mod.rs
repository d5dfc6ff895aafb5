//! Diagnostic logging to disk.
//!
//! The terminal is owned by the UI, so `tracing` output goes to
//! `<log_dir>/peerfeed.log` instead of stderr. The log directory is taken from
//! the config (default: `~/.local/share/peerfeed/logs/`).

use crate::config::LoggingConfig;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;

pub const LOG_FILE_NAME: &str = "peerfeed.log";

/// Install the global subscriber. Returns the log file path, or `None` when
/// logging is disabled or the file could not be opened.
pub fn init(config: &LoggingConfig) -> Option<PathBuf> {
    if !config.enabled {
        return None;
    }

    let log_dir = expand_home(&config.log_dir);
    if fs::create_dir_all(&log_dir).is_err() {
        return None;
    }
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    let installed = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(parse_level(&config.level))
        .try_init()
        .is_ok();

    installed.then_some(path)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(dir: &str) -> PathBuf {
    if let Some(rest) = dir.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches(['/', '\\']));
        }
    }
    PathBuf::from(dir)
}

fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}
