//! Configuration management for the availability engine
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::availability::DEFAULT_HORIZON_DAYS;
use crate::cache::{CachePolicy, RetryPolicy};
use crate::error::EngineError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Roster cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default query settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Roster cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum age of a cached roster in seconds
    #[serde(default = "default_max_age")]
    pub max_age_seconds: u64,
    /// Total fetch attempts before giving up
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Delay before the first retry in milliseconds
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    /// Optional upper bound on one fetch attempt in seconds
    #[serde(default)]
    pub attempt_timeout_seconds: Option<u64>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Default query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum number of participants returned by a query
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Days scanned when looking for the next available window
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

// Default value functions
fn default_max_age() -> u64 {
    300
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_results() -> usize {
    10
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_seconds: default_max_age(),
            retries: default_retries(),
            backoff_base_ms: default_backoff_base(),
            attempt_timeout_seconds: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            horizon_days: default_horizon_days(),
        }
    }
}

impl CacheConfig {
    /// Cache policy described by these settings
    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            max_age: Duration::from_secs(self.max_age_seconds),
            retry: RetryPolicy {
                attempts: self.retries,
                base_delay: Duration::from_millis(self.backoff_base_ms),
                attempt_timeout: self.attempt_timeout_seconds.map(Duration::from_secs),
            },
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> Result<Self, EngineError> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self, EngineError> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. AVAILABILITY_CACHE__RETRIES=5
        builder = builder.add_source(
            Environment::with_prefix("AVAILABILITY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().map_err(|e| {
            EngineError::config(format!("Failed to build configuration: {e}"))
        })?;

        let config: EngineConfig = settings.try_deserialize().map_err(|e| {
            EngineError::config(format!("Failed to deserialize configuration: {e}"))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("availability-engine").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<(), EngineError> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<(), EngineError> {
        if self.cache.retries == 0 || self.cache.retries > 10 {
            return Err(EngineError::config(
                "Cache retries must be between 1 and 10",
            ));
        }

        if self.cache.max_age_seconds > 7 * 24 * 60 * 60 {
            return Err(EngineError::config(
                "Cache max age cannot exceed 604800 seconds (1 week)",
            ));
        }

        if self.cache.backoff_base_ms > 60_000 {
            return Err(EngineError::config(
                "Cache backoff base cannot exceed 60000 ms",
            ));
        }

        if self.cache.attempt_timeout_seconds == Some(0) {
            return Err(EngineError::config(
                "Fetch attempt timeout must be at least 1 second",
            ));
        }

        if self.defaults.max_results == 0 || self.defaults.max_results > 1000 {
            return Err(EngineError::config(
                "Maximum results must be between 1 and 1000",
            ));
        }

        if self.defaults.horizon_days == 0 || self.defaults.horizon_days > 28 {
            return Err(EngineError::config(
                "Availability horizon must be between 1 and 28 days",
            ));
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(EngineError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(EngineError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            )));
        }

        Ok(())
    }
}
