//! Environment-driven configuration.

use std::time::Duration;

use crate::queue::QueueConfig;

/// Error raised when an `EASEL_*` variable holds an unusable value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    NotANumber { name: &'static str, value: String },

    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        name: &'static str,
        value: u64,
        min: u64,
    },
}

/// Runtime settings for the submission engine.
///
/// | Variable                    | Default |
/// |-----------------------------|---------|
/// | `EASEL_CORE_SIZE`           | 3       |
/// | `EASEL_QUEUE_SIZE`          | 10      |
/// | `EASEL_REMOTE_TIMEOUT_SECS` | 300     |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EaselConfig {
    pub queue: QueueConfig,
    /// Upper bound for a single upload or dispatch call.
    pub remote_timeout: Duration,
}

impl Default for EaselConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            remote_timeout: Duration::from_secs(300),
        }
    }
}

impl EaselConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; unset variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let core_size = read(&lookup, "EASEL_CORE_SIZE", defaults.queue.core_size as u64, 1)?;
        let queue_size = read(&lookup, "EASEL_QUEUE_SIZE", defaults.queue.queue_size as u64, 0)?;
        let timeout_secs = read(
            &lookup,
            "EASEL_REMOTE_TIMEOUT_SECS",
            defaults.remote_timeout.as_secs(),
            1,
        )?;

        Ok(Self {
            queue: QueueConfig::new(core_size as usize, queue_size as usize),
            remote_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn read(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
    min: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::NotANumber { name, value: raw })?;
    if value < min {
        return Err(ConfigError::TooSmall { name, value, min });
    }
    Ok(value)
}
