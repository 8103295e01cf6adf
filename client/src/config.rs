//! Configuration module for the Campus client.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `CAMPUS_API_URL` | Yes | - | REST API base URL (e.g., `https://api.campus.example/v1`) |
//! | `CAMPUS_SESSION_DIR` | No | `~/.campus` | Directory containing `session.json` |
//! | `CAMPUS_REQUEST_TIMEOUT_SECS` | No | 30 | HTTP request timeout (1-300) |
//!
//! # Example
//!
//! ```no_run
//! use campus_client::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("API URL: {}", config.api_url);
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

/// Default session directory name relative to home.
const DEFAULT_SESSION_DIR: &str = ".campus";

/// Default HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Minimum allowed request timeout in seconds.
const MIN_REQUEST_TIMEOUT_SECS: u64 = 1;

/// Maximum allowed request timeout in seconds.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Configuration for the Campus client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,

    /// Directory holding the persisted session.
    pub session_dir: PathBuf,

    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `CAMPUS_API_URL` is not set or is not an http(s) URL
    /// - `CAMPUS_REQUEST_TIMEOUT_SECS` is set but is not an integer in 1-300
    /// - The home directory cannot be determined (needed for the default session path)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Required: CAMPUS_API_URL
        let api_url = env::var("CAMPUS_API_URL")
            .map_err(|_| ConfigError::MissingEnvVar("CAMPUS_API_URL".to_string()))?;
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "CAMPUS_API_URL".to_string(),
                message: format!("expected an http(s) URL, got '{api_url}'"),
            });
        }

        // Optional: CAMPUS_SESSION_DIR (default: ~/.campus)
        let session_dir = match env::var("CAMPUS_SESSION_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs.home_dir().join(DEFAULT_SESSION_DIR)
            }
        };

        // Optional: CAMPUS_REQUEST_TIMEOUT_SECS (default: 30, must be 1-300)
        let timeout_secs = match env::var("CAMPUS_REQUEST_TIMEOUT_SECS") {
            Ok(val) => {
                let secs = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    key: "CAMPUS_REQUEST_TIMEOUT_SECS".to_string(),
                    message: format!("expected positive integer, got '{val}'"),
                })?;
                if !(MIN_REQUEST_TIMEOUT_SECS..=MAX_REQUEST_TIMEOUT_SECS).contains(&secs) {
                    return Err(ConfigError::InvalidValue {
                        key: "CAMPUS_REQUEST_TIMEOUT_SECS".to_string(),
                        message: format!(
                            "timeout must be between {MIN_REQUEST_TIMEOUT_SECS} and {MAX_REQUEST_TIMEOUT_SECS} seconds, got {secs}"
                        ),
                    });
                }
                secs
            }
            Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url,
            session_dir,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
