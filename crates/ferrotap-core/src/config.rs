//! Tap configuration.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::error::ConfigError;
use crate::retry::{Backoff, RetryConfig};

/// Environment variable overriding `key`.
pub const KEY_ENV: &str = "FERROTAP_KEY";
/// Environment variable overriding `secret`.
pub const SECRET_ENV: &str = "FERROTAP_SECRET";

/// Settings read from the `--config` JSON file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapConfig {
    /// Bitso API key.
    #[serde(default)]
    pub key: String,
    /// Bitso API secret.
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Order books to partition book-based streams by.
    #[serde(default = "default_books")]
    pub books: Vec<String>,
    /// Sent as the `User-Agent` header when set.
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Constant wait between attempts, jittered by up to half.
    #[serde(default = "default_retry_wait_ms")]
    pub retry_wait_ms: u64,
    /// Retry budget per request in seconds; 0 disables the limit.
    #[serde(default = "default_max_elapsed_secs")]
    pub max_elapsed_secs: u64,
}

fn default_base_url() -> String {
    String::from("https://api.bitso.com")
}

fn default_books() -> Vec<String> {
    vec![String::from("btc_mxn")]
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    60
}

fn default_retry_wait_ms() -> u64 {
    1_000
}

fn default_max_elapsed_secs() -> u64 {
    600
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            secret: String::new(),
            base_url: default_base_url(),
            books: default_books(),
            user_agent: None,
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_wait_ms: default_retry_wait_ms(),
            max_elapsed_secs: default_max_elapsed_secs(),
        }
    }
}

impl fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapConfig")
            .field("key", &redact(&self.key))
            .field("secret", &redact(&self.secret))
            .field("base_url", &self.base_url)
            .field("books", &self.books)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_attempts", &self.max_attempts)
            .field("retry_wait_ms", &self.retry_wait_ms)
            .field("max_elapsed_secs", &self.max_elapsed_secs)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "***REDACTED***"
    }
}

impl TapConfig {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|error| ConfigError::Parse {
            path: origin.to_owned(),
            message: error.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        Self::from_json_str(&raw, &path.display().to_string())
    }

    /// Apply `FERROTAP_KEY` / `FERROTAP_SECRET` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply credential overrides from an arbitrary lookup; empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(KEY_ENV).filter(|value| !value.is_empty()) {
            self.key = key;
        }
        if let Some(secret) = lookup(SECRET_ENV).filter(|value| !value.is_empty()) {
            self.secret = secret;
        }
        self
    }

    /// Check everything that would otherwise fail mid-sync.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.credentials()?;

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl {
                value: self.base_url.clone(),
            });
        }

        if let Some(index) = self.books.iter().position(|book| book.trim().is_empty()) {
            return Err(ConfigError::EmptyBook { index });
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(())
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Credentials::new(self.key.clone(), self.secret.clone())
    }

    /// Retry policy: constant jittered wait, default retriable statuses.
    pub fn retry_config(&self) -> RetryConfig {
        let max_elapsed =
            (self.max_elapsed_secs > 0).then(|| Duration::from_secs(self.max_elapsed_secs));

        RetryConfig {
            max_attempts: self.max_attempts,
            backoff: Backoff::Fixed {
                delay: Duration::from_millis(self.retry_wait_ms),
                jitter: true,
            },
            ..RetryConfig::default()
        }
        .with_max_elapsed(max_elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let config = TapConfig::from_json_str(r#"{"key":"k","secret":"s"}"#, "inline")
            .expect("valid config");

        assert_eq!(config.base_url, "https://api.bitso.com");
        assert_eq!(config.books, vec![String::from("btc_mxn")]);
        assert_eq!(config.user_agent, None);
        assert_eq!(config.request_timeout_ms, 30_000);
        assert_eq!(config.max_attempts, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let config = TapConfig::from_json_str(r#"{"key":"k"}"#, "inline").expect("parses");
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingCredential { field: "secret" })
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut config = TapConfig::new("k", "s");
        config.base_url = String::from("api.bitso.com");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBaseUrl { .. })));

        let mut config = TapConfig::new("k", "s");
        config.books = vec![String::from("btc_mxn"), String::from(" ")];
        assert_eq!(config.validate(), Err(ConfigError::EmptyBook { index: 1 }));

        let mut config = TapConfig::new("k", "s");
        config.max_attempts = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));
    }

    #[test]
    fn environment_overrides_credentials() {
        let config = TapConfig::new("file-key", "file-secret").with_overrides_from(|name| match name {
            KEY_ENV => Some(String::from("env-key")),
            SECRET_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.key, "env-key");
        assert_eq!(config.secret, "file-secret");
    }

    #[test]
    fn retry_config_follows_settings() {
        let mut config = TapConfig::new("k", "s");
        config.max_attempts = 5;
        config.retry_wait_ms = 250;
        config.max_elapsed_secs = 0;

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.max_elapsed, None);
        assert_eq!(
            retry.backoff,
            Backoff::Fixed {
                delay: Duration::from_millis(250),
                jitter: true
            }
        );
        assert!(retry.should_retry_status(400));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let rendered = format!("{:?}", TapConfig::new("my-key", "my-secret"));
        assert!(!rendered.contains("my-key"));
        assert!(!rendered.contains("my-secret"));
    }
}
