//! Configuration for the chat client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default remote API root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Environment variable overriding the API root.
pub const BASE_URL_ENV: &str = "TRAFFIC_AI_API_BASE_URL";
/// Environment variable overriding the per-request timeout (seconds).
pub const TIMEOUT_ENV: &str = "TRAFFIC_AI_TIMEOUT_SECS";
/// Environment variable overriding the ask timeout (seconds).
pub const ASK_TIMEOUT_ENV: &str = "TRAFFIC_AI_ASK_TIMEOUT_SECS";
/// Environment variable overriding the durable store location.
pub const STORAGE_PATH_ENV: &str = "TRAFFIC_AI_STORAGE_PATH";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API root is not an absolute http(s) URL.
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl {
        /// Offending value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// An environment variable holds an unparsable value.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
    /// A duration setting is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Configuration of the chat client core and its HTTP adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root URL of the remote API, e.g. `http://localhost:8000/api/v1`.
    pub base_url: String,
    /// Timeout applied to every HTTP request.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Upper bound on one send; past it the send takes the failure path.
    #[serde(with = "duration_serde")]
    pub ask_timeout: Duration,
    /// Lifetime of notifications created without an explicit TTL.
    #[serde(with = "duration_serde")]
    pub notification_ttl: Duration,
    /// Characters of the first message kept in a derived conversation title.
    pub title_max_chars: usize,
    /// Longest message the front end accepts, in characters.
    pub max_message_chars: usize,
    /// Location of the durable key-value store.
    pub storage_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            ask_timeout: Duration::from_secs(60),
            notification_ttl: Duration::from_millis(5_000),
            title_max_chars: 50,
            max_message_chars: 1_000,
            storage_path: PathBuf::from(".traffic_ai").join("storage.json"),
        }
    }
}

impl ClientConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the `TRAFFIC_AI_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.base_url = url;
        }
        if let Some(secs) = env_secs(TIMEOUT_ENV)? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs(ASK_TIMEOUT_ENV)? {
            config.ask_timeout = Duration::from_secs(secs);
        }
        if let Ok(path) = std::env::var(STORAGE_PATH_ENV) {
            config.storage_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the API root.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the bound on one send.
    #[must_use]
    pub const fn with_ask_timeout(mut self, timeout: Duration) -> Self {
        self.ask_timeout = timeout;
        self
    }

    /// Set the default notification lifetime.
    #[must_use]
    pub const fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    /// Set the durable store location.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Check the settings for consistency.
    ///
    /// # Errors
    /// Returns an error on a malformed base URL or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_root()?;
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("request_timeout"));
        }
        if self.ask_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("ask_timeout"));
        }
        Ok(())
    }

    /// Parsed API root, normalised to end with `/` so relative joins keep the path prefix.
    ///
    /// # Errors
    /// Returns an error if the base URL is not an absolute http(s) URL.
    pub fn api_root(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

fn env_secs(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}

/// Serde module for Duration serialization as milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
