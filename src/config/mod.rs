//! Configuration handling for the service.
//!
//! Everything is read from environment variables with development defaults.
//! Per-request settings (GitHub credentials, Markdown templates) are not part
//! of this struct; they travel with the request that needs them.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Environment variable names. Public so tests and the binaries can refer to
/// them.
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_SOURCE_HOST: &str = "SOURCE_HOST";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_ASSET_CONCURRENCY: &str = "ASSET_CONCURRENCY";

/// Default development values used when environment variables are absent.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_SOURCE_HOST: &str = "mp.weixin.qq.com";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_ASSET_CONCURRENCY: usize = 4;

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    bind_addr: String,
    source_host: String,
    github_api_url: String,
    asset_concurrency: usize,
}

impl Config {
    /// Create a new config explicitly.
    pub fn new(
        bind_addr: impl Into<String>,
        source_host: impl Into<String>,
        github_api_url: impl Into<String>,
        asset_concurrency: usize,
    ) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            source_host: source_host.into(),
            github_api_url: github_api_url.into(),
            asset_concurrency: asset_concurrency.max(1),
        }
    }

    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let source_host =
            env::var(ENV_SOURCE_HOST).unwrap_or_else(|_| DEFAULT_SOURCE_HOST.to_string());
        let github_api_url =
            env::var(ENV_GITHUB_API_URL).unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string());
        let asset_concurrency = match env::var(ENV_ASSET_CONCURRENCY) {
            Ok(raw) => parse_concurrency(&raw)?,
            Err(_) => DEFAULT_ASSET_CONCURRENCY,
        };

        url::Url::parse(&github_api_url).map_err(|e| ConfigError::InvalidValue {
            field: ENV_GITHUB_API_URL,
            reason: e.to_string(),
        })?;

        Ok(Self {
            bind_addr,
            source_host,
            github_api_url: github_api_url.trim_end_matches('/').to_string(),
            asset_concurrency,
        })
    }

    /// TCP bind address (host:port) for the HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
    /// Host substring a direct-sync URL must contain.
    pub fn source_host(&self) -> &str {
        &self.source_host
    }
    /// Base URL of the GitHub REST API, without a trailing slash.
    pub fn github_api_url(&self) -> &str {
        &self.github_api_url
    }
    /// Upper bound on parallel asset fetches while packaging.
    pub fn asset_concurrency(&self) -> usize {
        self.asset_concurrency
    }

    /// Development defaults (mirrors `from_env` with no env overrides).
    pub fn default() -> Self {
        Self::new(
            DEFAULT_BIND_ADDR,
            DEFAULT_SOURCE_HOST,
            DEFAULT_GITHUB_API_URL,
            DEFAULT_ASSET_CONCURRENCY,
        )
    }
}

fn parse_concurrency(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            field: ENV_ASSET_CONCURRENCY,
            reason: "must be at least 1".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidValue {
            field: ENV_ASSET_CONCURRENCY,
            reason: e.to_string(),
        }),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}
