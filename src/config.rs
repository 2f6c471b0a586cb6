use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Store configuration loaded from environment variables.
///
/// Every variable has a default, so an empty environment yields a working
/// configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_path: PathBuf::from(env_or_default(
                "FORUM_DATABASE_PATH",
                "./data/forum.sqlite",
            )),
            max_connections: parse_env_u32("FORUM_DB_MAX_CONNECTIONS", 1)?,
            busy_timeout: Duration::from_secs(parse_env_u64("FORUM_DB_BUSY_TIMEOUT_SECS", 10)?),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_DB_MAX_CONNECTIONS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_DATABASE_PATH".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
