//! Configuration module for Blockblob Uploadr
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. Every tunable of the
//! upload engine lives in [`UploadConfig`], which callers may also build in
//! code.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Largest block the blob service accepts (4000 MiB)
pub const MAX_BLOCK_SIZE: usize = 4000 * 1024 * 1024;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upload.validate()?;

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}': must be one of trace, debug, info, warn, error",
                other
            ))),
        }
    }
}

/// What to do with a zero-length source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyFilePolicy {
    /// Commit an empty block list, producing a zero-length blob
    #[default]
    CommitEmpty,
    /// Fail before any request is sent
    Reject,
}

/// Upload engine configuration
///
/// # Example
///
/// ```yaml
/// upload:
///   block_size: 8388608
///   block_timeout_secs: 60
///   commit_timeout_secs: 60
///   deadline_secs: 3600
///   empty_file: commit_empty
///   retry:
///     max_attempts: 3
///     backoff_min_millis: 5000
///     backoff_max_millis: 10000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Size of every block except possibly the last. Default: 8 MiB
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Budget for a single Put Block attempt. Default: 60
    #[serde(default = "default_block_timeout")]
    pub block_timeout_secs: u64,

    /// Budget for the Put Block List call. Default: 60
    #[serde(default = "default_commit_timeout")]
    pub commit_timeout_secs: u64,

    /// Optional budget for the whole session
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub empty_file: EmptyFilePolicy,
}

impl UploadConfig {
    pub fn block_timeout(&self) -> Duration {
        Duration::from_secs(self.block_timeout_secs)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_secs(self.commit_timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Validate the upload settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::ValidationError(
                "block_size must be greater than zero".into(),
            ));
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "block_size {} exceeds the service maximum of {} bytes",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        if self.block_timeout_secs == 0 || self.commit_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "block_timeout_secs and commit_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.deadline_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "deadline_secs must be greater than zero when set".into(),
            ));
        }
        self.retry.validate()
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            block_timeout_secs: default_block_timeout(),
            commit_timeout_secs: default_commit_timeout(),
            deadline_secs: None,
            retry: RetryConfig::default(),
            empty_file: EmptyFilePolicy::default(),
        }
    }
}

fn default_block_size() -> usize {
    8 * 1024 * 1024 // 8MiB
}

fn default_block_timeout() -> u64 {
    60
}

fn default_commit_timeout() -> u64 {
    60
}

/// Per-block retry configuration
///
/// `max_attempts` counts the first attempt, so 3 means at most two retries.
/// The delay before each retry is drawn uniformly from
/// `[backoff_min_millis, backoff_max_millis]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_min")]
    pub backoff_min_millis: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_millis: u64,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.backoff_min_millis > self.backoff_max_millis {
            return Err(ConfigError::ValidationError(format!(
                "retry.backoff_min_millis ({}) exceeds retry.backoff_max_millis ({})",
                self.backoff_min_millis, self.backoff_max_millis
            )));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_min_millis: default_backoff_min(),
            backoff_max_millis: default_backoff_max(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_min() -> u64 {
    5000
}

fn default_backoff_max() -> u64 {
    10000
}

/// Logging configuration for the command-line driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error. Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
