/*!
 * Session Configuration
 *
 * Counts, pacing and policies for the demo sessions. Defaults reproduce the
 * reference behavior; `fast()` removes every sleep for tests, and
 * `from_env()` layers `IPC_*` overrides on top of the defaults.
 */

use crate::core::limits::{
    CHANNEL_MAX_PENDING_MESSAGES, DEFAULT_CONSUMER_THROTTLE, DEFAULT_FIFO_DEPTH, DEFAULT_LINGER,
    DEFAULT_MESSAGE_COUNT, DEFAULT_MESSAGE_INTERVAL, DEFAULT_RECORD_COUNT, DEFAULT_REQUEST_COUNT,
    FIFO_ELEMENT_SIZE, FIFO_MAX_BYTES,
};
use crate::core::types::Deadline;
use crate::patterns::{ClosePolicy, ReadShape};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Session configuration
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SessionConfig {
    /// Text messages sent by the streaming producer
    pub message_count: u32,
    /// Pause after each streamed message
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub message_interval: Duration,
    /// Pause before the streaming producer closes its endpoint
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub linger: Duration,
    /// Requests issued by the add client
    pub request_count: u32,
    /// Fibonacci records pushed through the fifo
    pub record_count: usize,
    /// Fifo depth in elements
    pub fifo_depth: usize,
    /// Simulated per-item latency in the fifo consumer
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub consumer_throttle: Duration,
    pub close_policy: ClosePolicy,
    pub read_shape: ReadShape,
    /// Channel queue bound per endpoint
    pub max_pending_messages: usize,
    /// Deadline applied to every wait; unbounded when absent
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub wait_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            message_count: DEFAULT_MESSAGE_COUNT,
            message_interval: DEFAULT_MESSAGE_INTERVAL,
            linger: DEFAULT_LINGER,
            request_count: DEFAULT_REQUEST_COUNT,
            record_count: DEFAULT_RECORD_COUNT,
            fifo_depth: DEFAULT_FIFO_DEPTH,
            consumer_throttle: DEFAULT_CONSUMER_THROTTLE,
            close_policy: ClosePolicy::Abandon,
            read_shape: ReadShape::CheckSignalsFirst,
            max_pending_messages: CHANNEL_MAX_PENDING_MESSAGES,
            wait_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Defaults with every sleep removed
    pub const fn fast() -> Self {
        Self {
            message_count: DEFAULT_MESSAGE_COUNT,
            message_interval: Duration::ZERO,
            linger: Duration::ZERO,
            request_count: DEFAULT_REQUEST_COUNT,
            record_count: DEFAULT_RECORD_COUNT,
            fifo_depth: DEFAULT_FIFO_DEPTH,
            consumer_throttle: Duration::ZERO,
            close_policy: ClosePolicy::Abandon,
            read_shape: ReadShape::CheckSignalsFirst,
            max_pending_messages: CHANNEL_MAX_PENDING_MESSAGES,
            wait_timeout: None,
        }
    }

    /// Drop all pacing sleeps, keeping counts and policies
    pub fn without_delays(mut self) -> Self {
        self.message_interval = Duration::ZERO;
        self.linger = Duration::ZERO;
        self.consumer_throttle = Duration::ZERO;
        self
    }

    /// Deadline for a wait starting now
    #[inline]
    pub fn deadline(&self) -> Deadline {
        Deadline::from_timeout(self.wait_timeout)
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the JSON file named by `IPC_CONFIG`, then individual `IPC_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os("IPC_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                let json = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                serde_json::from_str(&json)?
            }
            None => Self::default(),
        };

        if let Some(fast) = env_value("IPC_FAST") {
            if matches!(fast.as_str(), "1" | "true" | "yes") {
                config = config.without_delays();
            }
        }
        if let Some(value) = env_value("IPC_MESSAGE_COUNT") {
            config.message_count = parse_number("IPC_MESSAGE_COUNT", value)?;
        }
        if let Some(value) = env_value("IPC_REQUEST_COUNT") {
            config.request_count = parse_number("IPC_REQUEST_COUNT", value)?;
        }
        if let Some(value) = env_value("IPC_RECORD_COUNT") {
            config.record_count = parse_number("IPC_RECORD_COUNT", value)?;
        }
        if let Some(value) = env_value("IPC_FIFO_DEPTH") {
            config.fifo_depth = parse_number("IPC_FIFO_DEPTH", value)?;
        }
        if let Some(value) = env_value("IPC_MAX_PENDING_MESSAGES") {
            config.max_pending_messages = parse_number("IPC_MAX_PENDING_MESSAGES", value)?;
        }
        if let Some(value) = env_value("IPC_WAIT_TIMEOUT_MS") {
            let millis: u64 = parse_number("IPC_WAIT_TIMEOUT_MS", value)?;
            config.wait_timeout = Some(Duration::from_millis(millis));
        }
        if let Some(value) = env_value("IPC_CLOSE_POLICY") {
            config.close_policy = ClosePolicy::from_str(&value.replace('_', "-"), true).map_err(|_| {
                ConfigError::InvalidValue {
                    key: "IPC_CLOSE_POLICY",
                    value,
                }
            })?;
        }
        if let Some(value) = env_value("IPC_READ_SHAPE") {
            config.read_shape = ReadShape::from_str(&value.replace('_', "-"), true).map_err(|_| {
                ConfigError::InvalidValue {
                    key: "IPC_READ_SHAPE",
                    value,
                }
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject shapes the transports would refuse at creation time
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fifo_bytes = self.fifo_depth.checked_mul(FIFO_ELEMENT_SIZE);
        if self.fifo_depth == 0 || fifo_bytes.map_or(true, |bytes| bytes > FIFO_MAX_BYTES) {
            return Err(ConfigError::Invalid(format!(
                "fifo_depth must be between 1 and {}",
                FIFO_MAX_BYTES / FIFO_ELEMENT_SIZE
            )));
        }
        if self.max_pending_messages == 0 {
            return Err(ConfigError::Invalid(
                "max_pending_messages must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.message_count, 10);
        assert_eq!(config.record_count, 32);
        assert_eq!(config.fifo_depth, 8);
        assert_eq!(config.message_interval, Duration::from_millis(100));
        assert_eq!(config.close_policy, ClosePolicy::Abandon);
        assert!(config.wait_timeout.is_none());
    }

    #[test]
    fn test_fast_matches_defaults_without_delays() {
        assert_eq!(SessionConfig::fast(), SessionConfig::default().without_delays());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SessionConfig::from_json(
            r#"{"request_count": 3, "linger": 0, "close_policy": "drain", "wait_timeout": 250}"#,
        )
        .unwrap();
        assert_eq!(config.request_count, 3);
        assert_eq!(config.linger, Duration::ZERO);
        assert_eq!(config.close_policy, ClosePolicy::Drain);
        assert_eq!(config.wait_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.record_count, 32);
    }

    #[test]
    fn test_rejects_oversized_fifo() {
        let err = SessionConfig::from_json(r#"{"fifo_depth": 1024}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_json_roundtrip_uses_milliseconds() {
        let json = serde_json::to_value(SessionConfig::default()).unwrap();
        assert_eq!(json["consumer_throttle"], 50);
        assert_eq!(json["read_shape"], "check_signals_first");
    }
}
