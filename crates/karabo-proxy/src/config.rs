//! Configuration file handling for the WebProxy clients

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};

/// Connection settings for a WebProxy client
///
/// ```toml
/// base_url = "http://exflqr30450:8282"
/// access_token = "eyJhbGciOi..."
/// timeout = 30
/// connect_timeout = 2.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the WebProxy
    pub base_url: String,
    /// Bearer token for write operations
    #[serde(default)]
    pub access_token: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout", with = "secs")]
    pub timeout: Duration,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout", with = "secs")]
    pub connect_timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl ProxyConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse WebProxy configuration")
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Durations as (fractional) seconds
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ProxyConfig::from_toml_str(r#"base_url = "http://localhost:8282""#).unwrap();
        assert_eq!(config, ProxyConfig::new("http://localhost:8282"));
    }

    #[test]
    fn test_full_config() {
        let config = ProxyConfig::from_toml_str(
            r#"
            base_url = "http://exflqr30450:8282"
            access_token = "abc"
            timeout = 5
            connect_timeout = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.access_token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_missing_base_url() {
        assert!(ProxyConfig::from_toml_str("timeout = 5").is_err());
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let err = ProxyConfig::from_toml_str(
            r#"
            base_url = "http://localhost:8282"
            timeout = -1
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProxyConfig::load("/nonexistent/karabo-proxy.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
