//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::query::QueryOptions;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Options applied before each input's own option clause
    #[serde(default)]
    pub defaults: QueryOptions,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Field catalog source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Index mapping document (JSON)
    pub mapping_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("filterql").join("config.toml")),
            Some(PathBuf::from("/etc/filterql/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("FILTERQL_MAPPING") {
            self.catalog.mapping_path = Some(PathBuf::from(path));
        }

        if let Some(time_zone) = var("FILTERQL_TIME_ZONE") {
            self.defaults.time_zone = time_zone;
        }
        if let Some(size) = var("FILTERQL_SIZE") {
            match size.parse() {
                Ok(size) => self.defaults.size = size,
                Err(_) => tracing::warn!("Ignoring non-numeric FILTERQL_SIZE {:?}", size),
            }
        }

        if let Some(level) = var("FILTERQL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("FILTERQL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# filterql configuration
#
# Environment variables override these settings:
# - FILTERQL_MAPPING
# - FILTERQL_TIME_ZONE
# - FILTERQL_SIZE
# - FILTERQL_LOG_LEVEL
# - FILTERQL_LOG_FORMAT

[catalog]
# Index mapping document the field catalog is read from
# mapping_path = "/etc/filterql/mapping.json"

[defaults]
# Document shape: search, count or aggregation
query_type = "search"

# Bucket width for date_histogram aggregations
fixed_interval = "1d"

# Bucket width for histogram aggregations
histogram_interval = 10

# Number of hits returned by search queries
size = 10

# Zone for date literals: Z or +HH:MM / -HH:MM
time_zone = "Z"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
