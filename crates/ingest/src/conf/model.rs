//! Model — IngestConfig and its validation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_THRESHOLD, DEFAULT_DETECTION_PREFIX, DEFAULT_MESSAGE_DISPLAY_LEN,
    DEFAULT_YIELD_EVERY_CHUNKS, DEFAULT_YIELD_EVERY_LINES,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML in {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Window size once the input is above `chunk_threshold_bytes`
    pub chunk_size_bytes: usize,
    /// Inputs up to this size are read as a single window
    pub chunk_threshold_bytes: usize,
    /// Yield to the runtime after this many windows...
    pub yield_every_chunks: usize,
    /// ...or after this many lines, whichever comes first
    pub yield_every_lines: usize,
    /// Bytes sniffed for dialect detection
    pub detection_prefix_bytes: usize,
    /// Character cap on the body part of Homer messages
    pub message_display_len: usize,
    /// Optional cap on accumulated continuation text per entry (off by default)
    pub max_payload_bytes: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            chunk_threshold_bytes: DEFAULT_CHUNK_THRESHOLD,
            yield_every_chunks: DEFAULT_YIELD_EVERY_CHUNKS,
            yield_every_lines: DEFAULT_YIELD_EVERY_LINES,
            detection_prefix_bytes: DEFAULT_DETECTION_PREFIX,
            message_display_len: DEFAULT_MESSAGE_DISPLAY_LEN,
            max_payload_bytes: None,
        }
    }
}

impl IngestConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size_bytes == 0 {
            return Err(ConfigError::Invalid("chunk_size_bytes must be > 0".to_string()));
        }
        if self.yield_every_chunks == 0 {
            return Err(ConfigError::Invalid("yield_every_chunks must be > 0".to_string()));
        }
        if self.yield_every_lines == 0 {
            return Err(ConfigError::Invalid("yield_every_lines must be > 0".to_string()));
        }
        if self.detection_prefix_bytes == 0 {
            return Err(ConfigError::Invalid("detection_prefix_bytes must be > 0".to_string()));
        }
        if self.detection_prefix_bytes > self.chunk_threshold_bytes.max(self.chunk_size_bytes) {
            return Err(ConfigError::Invalid(format!(
                "detection_prefix_bytes ({}) must not exceed chunk_threshold_bytes ({})",
                self.detection_prefix_bytes, self.chunk_threshold_bytes
            )));
        }
        if self.message_display_len == 0 {
            return Err(ConfigError::Invalid("message_display_len must be > 0".to_string()));
        }
        if self.max_payload_bytes == Some(0) {
            return Err(ConfigError::Invalid("max_payload_bytes must be > 0 when set".to_string()));
        }
        Ok(())
    }
}
