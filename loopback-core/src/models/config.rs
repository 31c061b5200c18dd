use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound on processor input/output channels.
pub const MAX_CHANNELS: usize = 32;

/// Frames per processing block unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Timing of the capture thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sleep between packet polls (default: 10 ms).
    pub poll_interval: Duration,

    /// How often the default render endpoint is re-queried (default: 1 s).
    pub device_check_interval: Duration,

    /// Wait before re-acquiring after a failure or device change (default: 1 s).
    pub retry_backoff: Duration,

    /// Name given to the capture thread.
    pub thread_name: String,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval.is_zero() {
            return Err("poll interval must be non-zero".into());
        }
        if self.device_check_interval < self.poll_interval {
            return Err(format!(
                "device check interval {:?} is shorter than poll interval {:?}",
                self.device_check_interval, self.poll_interval
            ));
        }
        if self.retry_backoff < self.poll_interval {
            return Err(format!(
                "retry backoff {:?} is shorter than poll interval {:?}",
                self.retry_backoff, self.poll_interval
            ));
        }
        if self.thread_name.is_empty() {
            return Err("thread name must not be empty".into());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            device_check_interval: Duration::from_secs(1),
            retry_backoff: Duration::from_secs(1),
            thread_name: "loopback-capture".into(),
        }
    }
}

/// Block layout of the processing bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Frames per `process_replacing` call (default: 512).
    pub block_size: usize,

    /// Clamp for reported processor channel counts (default and maximum: 32).
    pub max_channels: usize,
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.block_size == 0 {
            return Err("block size must be non-zero".into());
        }
        if self.max_channels > MAX_CHANNELS {
            return Err(format!(
                "max channels {} exceeds limit of {}",
                self.max_channels, MAX_CHANNELS
            ));
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_channels: MAX_CHANNELS,
        }
    }
}
