//! Caller configuration.
//!
//! A relay config file holds the caller settings and the descriptor tree:
//!
//! ```toml
//! [caller]
//! total_timeout_ms = 2000
//! max_attempts = 4
//!
//! [caller.retry]
//! initial_backoff_ms = 10
//! max_backoff_ms = 200
//! backoff_multiplier = 2.0
//!
//! [descriptor]
//! policy = "load_balanced"
//!
//! [[descriptor.children]]
//! address = "10.0.0.1:9001"
//!
//! [[descriptor.children]]
//! address = "10.0.0.2:9001"
//! ```

use std::path::Path;
use std::time::Duration;

use relay_descriptor::{Descriptor, DescriptorConfig, DescriptorError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Invalid caller configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Backoff between failed attempts.
///
/// The default waits nothing: failing over to a different target does not
/// need the pause a retry against the same endpoint would.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Wait before the first failover, in milliseconds
    pub initial_backoff_ms: u64,
    /// Upper bound for any single wait, in milliseconds
    pub max_backoff_ms: u64,
    /// Factor applied to the wait after each failover
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 0,
            max_backoff_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Wait before failover number `retry_index` (0-based).
    pub fn backoff_for(&self, retry_index: u32) -> Duration {
        if self.initial_backoff_ms == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry_index).unwrap_or(i32::MAX);
        let ms = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = ms.min(self.max_backoff_ms as f64);
        Duration::from_millis(capped as u64)
    }

    fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "backoff_multiplier must be at least 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Settings of one service caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CallerConfig {
    /// Time budget of one logical call across all attempts; `None` leaves
    /// the call bounded only by the request's own deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_timeout_ms: Option<u64>,
    /// Maximum attempts per logical call; `None` tries every candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<usize>,
    pub retry: RetryConfig,
}

impl CallerConfig {
    pub fn total_timeout(&self) -> Option<Duration> {
        self.total_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_total_timeout(mut self, total_timeout_ms: u64) -> Self {
        self.total_timeout_ms = Some(total_timeout_ms);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".to_string()));
        }
        self.retry.validate()
    }
}

/// A complete relay configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default)]
    pub caller: CallerConfig,
    pub descriptor: DescriptorConfig,
}

impl RelayConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: RelayConfig = toml::from_str(s)?;
        config.caller.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Builds the descriptor tree declared in this file.
    pub fn build_descriptor(&self) -> Result<Descriptor> {
        Ok(self.descriptor.build()?)
    }
}
