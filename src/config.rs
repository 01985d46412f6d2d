// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Configuration
//!
//! Environment variable names, defaults and the [`ClientConfig`] loaded from
//! them. Blank values count as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `API_BASE_URL` | Root of the platform REST API | `http://127.0.0.1:8000/api` |
//! | `TOKEN_STORE_PATH` | JSON file holding the credential pair | unset (in-memory) |
//! | `HTTP_TIMEOUT_SECS` | Transport timeout in seconds | `15` |
//! | `LOG_FORMAT` | Logging format (`json`, `pretty` or `compact`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::telemetry::LogFormat;

/// Environment variable name for the API base URL.
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

/// Environment variable name for the credential file.
///
/// When unset, credentials live in memory and do not survive a restart.
pub const TOKEN_STORE_PATH_ENV: &str = "TOKEN_STORE_PATH";

/// Environment variable name for the transport timeout.
pub const HTTP_TIMEOUT_SECS_ENV: &str = "HTTP_TIMEOUT_SECS";

/// Environment variable name for the log format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default API base URL (local development backend).
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Default transport timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("{name} must be a positive number of seconds, got {value}")]
    InvalidTimeout { name: &'static str, value: String },
}

/// Settings needed to build a [`crate::state::ClientState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub token_store_path: Option<PathBuf>,
    pub http_timeout: Duration,
    pub log_format: LogFormat,
}

impl ClientConfig {
    /// Config for `api_base_url` with every other setting at its default.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let api_base_url = api_base_url.into();
        validate_url(API_BASE_URL_ENV, &api_base_url)?;
        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token_store_path: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            log_format: LogFormat::default(),
        })
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = var(API_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let mut config = Self::new(base_url)?;

        config.token_store_path = var(TOKEN_STORE_PATH_ENV).map(PathBuf::from);

        if let Some(raw) = var(HTTP_TIMEOUT_SECS_ENV) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout {
                    name: HTTP_TIMEOUT_SECS_ENV,
                    value: raw.clone(),
                })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        config.log_format = var(LOG_FORMAT_ENV)
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        Ok(config)
    }

    pub fn with_token_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_store_path = Some(path.into());
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_store_path: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            log_format: LogFormat::default(),
        }
    }
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        }),
    }
}
