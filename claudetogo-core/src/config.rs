//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/claudetogo/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/claudetogo/` (~/.config/claudetogo/)
//! - State/Logs: `$XDG_STATE_HOME/claudetogo/` (~/.local/state/claudetogo/)
//!
//! The event log and the messenger output directory are plain paths, resolved
//! relative to the working directory unless configured as absolute paths.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Log levels accepted in `[logging] level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Example configuration written by `claudetogo config init`.
pub const EXAMPLE_CONFIG: &str = r#"# ClaudeToGo configuration

[events]
# Event log written by the Claude Code hook (one JSON object per line)
file = "claude-events.jsonl"

[output]
# Directory for generated messenger JSON files
dir = "messenger-output"

[watcher]
# How often the service checks the event log for growth
poll_interval_ms = 2000

[monitor]
# How often `claudetogo monitor` checks for new events
poll_interval_ms = 100

[logging]
# trace, debug, info, warn, error
level = "info"
max_files = 5
"#;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Event log location
    #[serde(default)]
    pub events: EventsConfig,

    /// Messenger output location
    #[serde(default)]
    pub output: OutputConfig,

    /// Background watcher settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Live monitor settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Event log configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EventsConfig {
    /// Path to the JSONL event log
    #[serde(default = "default_events_file")]
    pub file: PathBuf,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            file: default_events_file(),
        }
    }
}

fn default_events_file() -> PathBuf {
    PathBuf::from("claude-events.jsonl")
}

/// Messenger output configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Directory that receives messenger JSON files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("messenger-output")
}

/// Watcher (service mode) configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// Poll interval in milliseconds
    #[serde(default = "default_watcher_poll")]
    pub poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_watcher_poll(),
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_watcher_poll() -> u64 {
    2000
}

/// Live monitor configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitorConfig {
    /// Poll interval in milliseconds
    #[serde(default = "default_monitor_poll")]
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_monitor_poll(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_monitor_poll() -> u64 {
    100
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.output.dir.as_os_str().is_empty() {
            return Err(Error::Config("output.dir cannot be empty".to_string()));
        }
        if self.events.file.as_os_str().is_empty() {
            return Err(Error::Config("events.file cannot be empty".to_string()));
        }
        if self.watcher.poll_interval_ms < 100 {
            return Err(Error::Config(
                "watcher.poll_interval_ms must be at least 100".to_string(),
            ));
        }
        if self.monitor.poll_interval_ms < 10 {
            return Err(Error::Config(
                "monitor.poll_interval_ms must be at least 10".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(Error::Config(format!(
                "logging.level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    /// Apply `CLAUDETOGO_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = non_empty_env("CLAUDETOGO_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(file) = non_empty_env("CLAUDETOGO_EVENTS_FILE") {
            self.events.file = PathBuf::from(file);
        }
        if let Some(level) = non_empty_env("CLAUDETOGO_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/claudetogo/config.toml` (~/.config/claudetogo/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("claudetogo").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/claudetogo/` (~/.local/state/claudetogo/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("claudetogo")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
