//! Output channel connection settings

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::client::REBOUND_SLEEP;
use crate::frame::DEFAULT_MAX_MESSAGE_SIZE;

/// How the output channel shares data among its inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataDistribution {
    #[default]
    Copy,
    Shared,
}

impl DataDistribution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Shared => "shared",
        }
    }
}

/// What the output channel does when this input falls behind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnSlowness {
    #[default]
    Drop,
    Wait,
    Queue,
    QueueDrop,
}

impl OnSlowness {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Wait => "wait",
            Self::Queue => "queue",
            Self::QueueDrop => "queueDrop",
        }
    }
}

impl fmt::Display for DataDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OnSlowness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for an [`AsyncChannelClient`](crate::AsyncChannelClient)
///
/// ```toml
/// host = "exflqr30450"
/// port = 38198
/// reconnect = true
/// on_slowness = "queueDrop"
/// reconnect_delay = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub host: String,
    pub port: u16,
    /// Reconnect after the stream ends or fails
    pub reconnect: bool,
    /// Identity announced in the handshake; derived from host and port if unset
    pub instance_id: Option<String>,
    pub data_distribution: DataDistribution,
    pub on_slowness: OnSlowness,
    pub max_queue_length: i32,
    /// Largest message accepted from the output channel, in bytes
    pub max_message_size: usize,
    /// Pause after each processed message, in seconds
    #[serde(with = "secs")]
    pub delay_on_input: Duration,
    /// Pause before reconnecting, in seconds
    #[serde(with = "secs")]
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
            reconnect: true,
            instance_id: None,
            data_distribution: DataDistribution::default(),
            on_slowness: OnSlowness::default(),
            max_queue_length: 2,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            delay_on_input: Duration::ZERO,
            reconnect_delay: REBOUND_SLEEP,
        }
    }
}

impl ChannelConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    /// Name used in the handshake, acknowledgements and handler calls
    pub fn name(&self) -> String {
        match &self.instance_id {
            Some(id) => id.clone(),
            None => format!("AsyncChannelClient<{}:{}>", self.host, self.port),
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse channel configuration")
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

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
