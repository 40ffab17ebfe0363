use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::DEFAULT_HASH_WINDOW;
use crate::scheduler::SchedulerConfig;

/// Default chunk size: 2 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// Files at or below this size (10 MiB) go up in a single request.
pub const DEFAULT_CHUNK_THRESHOLD: u64 = 10 * 1024 * 1024;

pub const DEFAULT_CONCURRENCY: usize = 3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tunables for one upload session.
///
/// Missing fields take their defaults when deserialized, so a config file
/// only needs the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UploadConfig {
    /// Bytes per chunk.
    pub chunk_size: u64,
    /// Chunk uploads in flight at once.
    pub concurrency: usize,
    /// Largest file sent with a single direct upload instead of chunks.
    pub chunk_threshold: u64,
    /// Deadline for a single chunk request, in milliseconds.
    pub chunk_timeout_ms: u64,
    /// Deadline for a direct upload, in milliseconds.
    pub simple_timeout_ms: u64,
    /// Bytes read per hashing step. Independent of `chunk_size`.
    pub hash_window: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            chunk_timeout_ms: 30_000,
            simple_timeout_ms: 60_000,
            hash_window: DEFAULT_HASH_WINDOW,
        }
    }
}

impl UploadConfig {
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_chunk_threshold(mut self, threshold: u64) -> Self {
        self.chunk_threshold = threshold;
        self
    }

    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_simple_timeout(mut self, timeout: Duration) -> Self {
        self.simple_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_hash_window(mut self, window: usize) -> Self {
        self.hash_window = window;
        self
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_millis(self.chunk_timeout_ms)
    }

    pub fn simple_timeout(&self) -> Duration {
        Duration::from_millis(self.simple_timeout_ms)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            concurrency: self.concurrency,
            chunk_timeout: self.chunk_timeout(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be greater than zero".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.hash_window == 0 {
            return Err(ConfigError::Invalid("hash_window must be greater than zero".into()));
        }
        if self.chunk_timeout_ms == 0 || self.simple_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be greater than zero".into()));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: UploadConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&json)
    }
}
