// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration management for mlat-client-config itself

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Main configuration structure for the questionnaire tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Package name written into the artifact header
    #[serde(default = "default_name")]
    pub name: String,

    /// Template file; the built-in set is used when absent
    #[serde(default)]
    pub templates: Option<PathBuf>,

    /// Where the configuration artifact is committed
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            templates: None,
            output: default_output(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "name cannot be empty".to_string(),
            });
        }

        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "output path cannot be empty".to_string(),
            });
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "logging format must be 'text' or 'json', not '{}'",
                    self.logging.format
                ),
            });
        }

        Ok(())
    }
}

// Default value functions

fn default_name() -> String {
    "mlat-client".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("/etc/default/mlat-client")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
