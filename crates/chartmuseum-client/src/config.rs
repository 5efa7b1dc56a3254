//! Client configuration
//!
//! Can be built in code or loaded from `~/.config/chartmuseum/client.yaml`:
//!
//! ```yaml
//! baseUrl: https://charts.example.com/
//! userAgent: my-deployer/1.0
//! timeout: 30s
//! auth:
//!   type: env
//!   usernameVar: CHARTMUSEUM_USER
//!   passwordVar: CHARTMUSEUM_PASSWORD
//! retry:
//!   maxRetries: 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::auth::AuthConfig;
use crate::error::{ClientError, Result};
use crate::redact::sanitize_url_str;

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "chartmuseum-rs";

/// Client configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Server root, e.g. `https://charts.example.com/`
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-request timeout; none means wait indefinitely
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ClientConfig {
    /// Configuration for an anonymous client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: default_user_agent(),
            auth: AuthConfig::None,
            retry: RetryConfig::default(),
            timeout: None,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = AuthConfig::basic(username, password);
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ClientError::UnreadableFile {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ClientError::config("Could not determine config directory"))?;
        Ok(config_dir.join("chartmuseum").join("client.yaml"))
    }

    /// Validate and normalize the base URL
    ///
    /// The result is absolute, http(s), and its path ends with `/` so that
    /// relative API paths resolve underneath it.
    pub fn parsed_base_url(&self) -> Result<Url> {
        parse_base_url(&self.base_url)
    }
}

/// Parse a base URL, appending the trailing `/` when missing
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClientError::config("base URL can not be blank"));
    }

    let mut url = Url::parse(trimmed).map_err(|e| ClientError::InvalidBaseUrl {
        url: sanitize_url_str(trimmed),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidBaseUrl {
            url: sanitize_url_str(trimmed),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Retry and backoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Additional attempts after the first one
    pub max_retries: u32,

    /// Lower bound of the linear backoff window (server errors)
    #[serde(with = "humantime_serde")]
    pub linear_min: Duration,

    /// Upper bound of the linear backoff window (server errors)
    #[serde(with = "humantime_serde")]
    pub linear_max: Duration,

    /// Minimum wait when rate limited
    #[serde(with = "humantime_serde")]
    pub rate_limit_floor: Duration,

    /// Floor plus the largest jitter added to a rate-limit wait
    #[serde(with = "humantime_serde")]
    pub rate_limit_ceiling: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            linear_min: Duration::from_millis(700),
            linear_max: Duration::from_millis(900),
            rate_limit_floor: Duration::from_millis(100),
            rate_limit_ceiling: Duration::from_millis(400),
        }
    }
}

impl RetryConfig {
    /// Never retry
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_linear_window(mut self, min: Duration, max: Duration) -> Self {
        self.linear_min = min;
        self.linear_max = max;
        self
    }

    pub fn with_rate_limit_window(mut self, floor: Duration, ceiling: Duration) -> Self {
        self.rate_limit_floor = floor;
        self.rate_limit_ceiling = ceiling;
        self
    }
}
