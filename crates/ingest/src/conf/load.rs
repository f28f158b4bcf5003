//! Load — config loading from file and environment variables.

use std::path::Path;
use std::str::FromStr;

use super::model::{ConfigError, IngestConfig};

pub const CONFIG_FILE_ENV: &str = "INGEST_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE: &str = "/etc/voicelog/ingest.toml";

impl IngestConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        if !Path::new(&config_path).exists() {
            tracing::info!("Config file not found at {}, using environment variables", config_path);
            return Ok(Self::from_env());
        }

        tracing::info!("Loading configuration from: {}", config_path);
        let mut config = Self::from_file(&config_path)?;
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Decode {
            path: path.to_string(),
            source,
        })
    }

    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_with(|key| std::env::var(key).ok());
        config
    }

    /// Override fields from `INGEST_*` variables. Unparseable values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_from(&lookup, "INGEST_CHUNK_SIZE", &mut self.chunk_size_bytes);
        override_from(&lookup, "INGEST_CHUNK_THRESHOLD", &mut self.chunk_threshold_bytes);
        override_from(&lookup, "INGEST_YIELD_EVERY_CHUNKS", &mut self.yield_every_chunks);
        override_from(&lookup, "INGEST_YIELD_EVERY_LINES", &mut self.yield_every_lines);
        override_from(&lookup, "INGEST_DETECTION_PREFIX", &mut self.detection_prefix_bytes);
        override_from(&lookup, "INGEST_MESSAGE_DISPLAY_LEN", &mut self.message_display_len);

        if let Some(raw) = lookup("INGEST_MAX_PAYLOAD_BYTES") {
            match raw.trim() {
                "" | "none" | "off" => self.max_payload_bytes = None,
                value => match value.parse() {
                    Ok(cap) => self.max_payload_bytes = Some(cap),
                    Err(_) => tracing::warn!(value = %raw, "ignoring invalid INGEST_MAX_PAYLOAD_BYTES"),
                },
            }
        }
    }
}

fn override_from<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable environment override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = IngestConfig::default();
        cfg.apply_env_with(env(&[
            ("INGEST_CHUNK_SIZE", "1024"),
            ("INGEST_YIELD_EVERY_LINES", " 50 "),
            ("INGEST_MAX_PAYLOAD_BYTES", "4096"),
        ]));
        assert_eq!(cfg.chunk_size_bytes, 1024);
        assert_eq!(cfg.yield_every_lines, 50);
        assert_eq!(cfg.max_payload_bytes, Some(4096));
        assert_eq!(cfg.detection_prefix_bytes, 64 * 1024);
    }

    #[test]
    fn test_env_invalid_values_ignored() {
        let mut cfg = IngestConfig::default();
        cfg.apply_env_with(env(&[("INGEST_CHUNK_SIZE", "lots"), ("INGEST_MAX_PAYLOAD_BYTES", "-1")]));
        assert_eq!(cfg, IngestConfig::default());
    }

    #[test]
    fn test_env_payload_cap_off() {
        let mut cfg = IngestConfig { max_payload_bytes: Some(10), ..Default::default() };
        cfg.apply_env_with(env(&[("INGEST_MAX_PAYLOAD_BYTES", "off")]));
        assert_eq!(cfg.max_payload_bytes, None);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunk_size_bytes = 65536\nmessage_display_len = 80").unwrap();

        let cfg = IngestConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.chunk_size_bytes, 65536);
        assert_eq!(cfg.message_display_len, 80);
    }

    #[test]
    fn test_from_file_errors() {
        let missing = IngestConfig::from_file("/nonexistent/ingest.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunk_size_bytes = \"big\"").unwrap();
        let bad = IngestConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(bad, ConfigError::Decode { .. }));
    }
}
