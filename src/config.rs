use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for repopulse
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Aggregation service endpoint settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Sync-progress polling settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Aggregation service configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    /// API base URL of the aggregation service
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Polling configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollConfig {
    /// Poll cadence while a sync is in flight
    #[serde(default = "default_poll_interval")]
    pub interval: String, // "2s"
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String, // "compact"

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}
fn default_poll_interval() -> String {
    "2s".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}
fn default_true() -> bool {
    true
}

// Default implementations
impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            poll: PollConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PollConfig {
    /// Parse the configured interval string into a duration.
    pub fn interval_duration(&self) -> Result<Duration> {
        parse_duration(&self.interval).map(Duration::from_secs_f64)
    }
}

/// Parse duration strings like "2s", "500ms", "1m".
fn parse_duration(duration_str: &str) -> Result<f64> {
    let duration_str = duration_str.trim().to_lowercase();

    if let Some(value) = duration_str.strip_suffix("ms") {
        value
            .parse::<f64>()
            .map(|v| v / 1000.0)
            .context("Invalid milliseconds value")
    } else if let Some(value) = duration_str.strip_suffix('s') {
        value.parse::<f64>().context("Invalid seconds value")
    } else if let Some(value) = duration_str.strip_suffix('m') {
        value
            .parse::<f64>()
            .map(|v| v * 60.0)
            .context("Invalid minutes value")
    } else if let Some(value) = duration_str.strip_suffix('h') {
        value
            .parse::<f64>()
            .map(|v| v * 3600.0)
            .context("Invalid hours value")
    } else {
        // Try to parse as raw seconds
        duration_str
            .parse::<f64>()
            .context("Invalid duration format. Use format like '2s', '500ms', '1m'")
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            // Create default config
            let config = Self::default();

            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            // Save default config
            config.save(&config_path)?;

            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("repopulse").join("config.yml"))
    }
}
