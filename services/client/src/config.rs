//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the habit tracker REST API, without a trailing slash.
    pub api_base_url: String,
    /// Requests that take longer fail as network-class errors.
    pub request_timeout: Duration,
    /// File backing the durable session storage.
    pub storage_path: PathBuf,
    pub log_level: Level,
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5105/api";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url(&api_base_url)?;

        let timeout_str = std::env::var("REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_MS.to_string());
        let timeout_ms = timeout_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("REQUEST_TIMEOUT_MS".to_string(), e.to_string())
        })?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "REQUEST_TIMEOUT_MS".to_string(),
                "timeout must be greater than zero".to_string(),
            ));
        }

        let storage_path = std::env::var("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.habit-tracker/storage.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_millis(timeout_ms),
            storage_path,
            log_level,
        })
    }

    /// A configuration pointing at `api_base_url` with every other value defaulted.
    pub fn for_base_url(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            storage_path: PathBuf::from("./.habit-tracker/storage.json"),
            log_level: Level::INFO,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue(
            "API_BASE_URL".to_string(),
            format!("'{}' is not an http(s) URL", raw),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = Config::for_base_url("http://localhost:5105/api/").unwrap();
        assert_eq!(config.api_base_url, "http://localhost:5105/api");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = Config::for_base_url("localhost:5105").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "API_BASE_URL"));
    }
}
