//! Server configuration.
//!
//! Loaded from TOML. Every top-level key has a default, so an empty file is
//! a valid configuration without streams.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use tailsql_common::config::StreamConfig;
use tailsql_common::DEFAULT_INGEST_QUEUE_CAPACITY;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Identifier of this instance, used as the consumer group name.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,

    /// Message broker addresses, passed through to transport collaborators.
    #[serde(default)]
    pub brokers: Vec<String>,

    /// Log level (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Limit on memory held by columnar batches, in MB.
    #[serde(default)]
    pub memory_limit_mb: Option<usize>,

    /// Per-query deadline in milliseconds.
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,

    /// Bounded queue length between a stream reader and its worker.
    #[serde(default = "default_ingest_queue_capacity")]
    pub ingest_queue_capacity: usize,

    /// Ingested streams, one relation each.
    #[serde(default)]
    pub streams: Vec<StreamConfig>,
}

fn default_instance_id() -> String {
    "tailsql".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ingest_queue_capacity() -> usize {
    DEFAULT_INGEST_QUEUE_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_id: default_instance_id(),
            brokers: Vec::new(),
            log_level: default_log_level(),
            memory_limit_mb: None,
            query_timeout_ms: None,
            ingest_queue_capacity: default_ingest_queue_capacity(),
            streams: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.instance_id.trim().is_empty() {
            bail!("instance_id must not be empty");
        }
        if self.ingest_queue_capacity == 0 {
            bail!("ingest_queue_capacity must be positive");
        }
        if self.memory_limit_mb == Some(0) {
            bail!("memory_limit_mb must be positive when set");
        }
        let mut topics = HashSet::new();
        for stream in &self.streams {
            stream.validate().map_err(anyhow::Error::msg)?;
            if !topics.insert(stream.topic.as_str()) {
                bail!("duplicate stream '{}'", stream.topic);
            }
        }
        Ok(())
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Memory limit in bytes.
    pub fn memory_limit_bytes(&self) -> Option<usize> {
        self.memory_limit_mb.map(|mb| mb.saturating_mul(1024 * 1024))
    }

    /// Per-query deadline.
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    /// Looks up a stream by topic.
    pub fn stream(&self, topic: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.topic == topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailsql_common::config::{DecodeErrorPolicy, InputFormat};
    use tempfile::TempDir;

    const CONFIG: &str = r#"
        instance_id = "tailsql-1"
        brokers = ["localhost:9092"]
        memory_limit_mb = 256
        query_timeout_ms = 5000

        [[streams]]
        topic = "events"
        format = "json"
        buffer_capacity = 128

        [[streams.schema.fields]]
        name = "name"
        type = { name = "utf8" }

        [[streams.schema.fields]]
        name = "amount"
        type = { name = "double" }

        [[streams]]
        topic = "lineitems"
        format = "psv"
        on_decode_error = "skip"

        [[streams.schema.fields]]
        name = "orderkey"
        type = { name = "long" }
    "#;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.instance_id, "tailsql");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.ingest_queue_capacity, DEFAULT_INGEST_QUEUE_CAPACITY);
        assert!(config.streams.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_parse_streams() {
        let config = ServerConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.instance_id, "tailsql-1");
        assert_eq!(config.brokers, vec!["localhost:9092".to_string()]);
        assert_eq!(config.memory_limit_bytes(), Some(256 * 1024 * 1024));
        assert_eq!(config.query_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.streams.len(), 2);

        let events = config.stream("events").unwrap();
        assert_eq!(events.format, InputFormat::Json);
        assert_eq!(events.buffer_capacity, 128);
        assert_eq!(events.schema.len(), 2);

        let lineitems = config.stream("lineitems").unwrap();
        assert_eq!(lineitems.on_decode_error, DecodeErrorPolicy::Skip);
        assert_eq!(lineitems.buffer_capacity, tailsql_common::DEFAULT_GROUP_SIZE);
    }

    #[test]
    fn test_duplicate_streams_rejected() {
        let text = r#"
            [[streams]]
            topic = "t"
            format = "json"
            [[streams.schema.fields]]
            name = "a"
            type = { name = "int" }

            [[streams]]
            topic = "t"
            format = "csv"
            [[streams.schema.fields]]
            name = "b"
            type = { name = "int" }
        "#;
        let err = ServerConfig::from_toml_str(text).unwrap_err();
        assert!(err.to_string().contains("duplicate stream 't'"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::from_toml_str(r#"instance_id = """#).is_err());
        assert!(ServerConfig::from_toml_str("ingest_queue_capacity = 0").is_err());
        assert!(ServerConfig::from_toml_str("memory_limit_mb = 0").is_err());
        let unknown_type = r#"
            [[streams]]
            topic = "t"
            format = "json"
            [[streams.schema.fields]]
            name = "a"
            type = { name = "decimal" }
        "#;
        assert!(ServerConfig::from_toml_str(unknown_type).is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let config = ServerConfig::from_toml_str(CONFIG).unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("instance_id"));
        let loaded = ServerConfig::from_toml_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tailsql.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let loaded = ServerConfig::from_file(&path).unwrap();
        assert_eq!(loaded.streams.len(), 2);

        let missing = temp_dir.path().join("missing.toml");
        assert!(ServerConfig::from_file(&missing).is_err());
    }
}
