//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port range: base {0} must be below max {1}")]
    InvalidPortRange(u16, u16),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid error-rate threshold: {0}. Must be within (0, 1]")]
    InvalidErrorRateThreshold(f64),

    #[error("Invalid command template: must contain a {{module}}:{{symbol}} placeholder")]
    InvalidCommandTemplate,

    #[error("Invalid tick interval: must be at least 1 second")]
    InvalidTickInterval,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .hatchery/config.yaml (project config, created by init)
    /// 3. .hatchery/local.yaml (project local overrides, optional)
    /// 4. Environment variables (HATCHERY_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".hatchery/config.yaml"))
            .merge(Yaml::file(".hatchery/local.yaml"))
            .merge(Env::prefixed("HATCHERY_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.deploy.base_port >= config.deploy.max_port {
            return Err(ConfigError::InvalidPortRange(
                config.deploy.base_port,
                config.deploy.max_port,
            ));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let threshold = config.monitor.error_rate_threshold;
        if threshold <= 0.0 || threshold > 1.0 {
            return Err(ConfigError::InvalidErrorRateThreshold(threshold));
        }

        if !config
            .deploy
            .command_template
            .iter()
            .any(|arg| arg.contains("{module}"))
        {
            return Err(ConfigError::InvalidCommandTemplate);
        }

        if config.daemon.tick_interval_secs == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }

        Ok(())
    }
}
