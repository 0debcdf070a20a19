//! Sender configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::broker::DeliveryMode;
use crate::error::ConfigError;

fn default_persistent() -> bool {
    true
}

/// Delivery settings shared by every send of a sender.
///
/// Fixed once constructed. Deserializes from
///
/// ```json
/// { "destination": "orders.in", "time_to_live_secs": 30, "persistent": true }
/// ```
///
/// where `time_to_live_secs` is optional (absent leaves the broker's default
/// expiry in place) and `persistent` defaults to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSenderConfig")]
pub struct SenderConfig {
    destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_to_live_secs: Option<u32>,
    persistent: bool,
}

#[derive(Deserialize)]
struct RawSenderConfig {
    destination: String,
    #[serde(default)]
    time_to_live_secs: Option<u32>,
    #[serde(default = "default_persistent")]
    persistent: bool,
}

impl TryFrom<RawSenderConfig> for SenderConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSenderConfig) -> Result<Self, Self::Error> {
        let mut config = SenderConfig::new(raw.destination)?.with_persistent(raw.persistent);
        config.time_to_live_secs = raw.time_to_live_secs;
        Ok(config)
    }
}

impl SenderConfig {
    /// Persistent delivery, broker default time-to-live.
    pub fn new(destination: impl Into<String>) -> Result<Self, ConfigError> {
        let destination = destination.into();
        if destination.trim().is_empty() {
            return Err(ConfigError::EmptyDestination);
        }
        Ok(SenderConfig {
            destination,
            time_to_live_secs: None,
            persistent: default_persistent(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_time_to_live(mut self, secs: u32) -> Self {
        self.time_to_live_secs = Some(secs);
        self
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn time_to_live_secs(&self) -> Option<u32> {
        self.time_to_live_secs
    }

    /// The configured time-to-live, if any.
    pub fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live_secs
            .map(|secs| Duration::from_secs(u64::from(secs)))
    }

    pub fn persistent(&self) -> bool {
        self.persistent
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::from(self.persistent)
    }
}
