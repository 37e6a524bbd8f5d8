//! Stream configuration structures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CSV_DELIMITER, DEFAULT_GROUP_SIZE, MIN_GROUP_SIZE, PSV_DELIMITER};
use crate::types::Schema;

/// Encoding of raw record values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// One JSON object per record.
    Json,
    /// Comma separated values, no header.
    Csv,
    /// Pipe separated values, no header.
    Psv,
}

impl InputFormat {
    /// Field delimiter for delimited formats, `None` for JSON.
    #[must_use]
    pub const fn delimiter(self) -> Option<u8> {
        match self {
            Self::Json => None,
            Self::Csv => Some(CSV_DELIMITER),
            Self::Psv => Some(PSV_DELIMITER),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Psv => write!(f, "psv"),
        }
    }
}

/// What the ingestion worker does when a flush fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    /// Stop the worker and surface the error.
    #[default]
    Abort,
    /// Evict undecodable records and keep ingesting.
    Skip,
}

/// Configuration of one ingested stream.
///
/// # Example
///
/// ```rust
/// use tailsql_common::config::{InputFormat, StreamConfig};
///
/// let config: StreamConfig = serde_json::from_str(r#"{
///     "topic": "events",
///     "format": "json",
///     "schema": { "fields": [ { "name": "name", "type": { "name": "utf8" } } ] }
/// }"#).unwrap();
///
/// assert_eq!(config.format, InputFormat::Json);
/// assert_eq!(config.buffer_capacity, tailsql_common::DEFAULT_GROUP_SIZE);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Topic name; also the relation name used in queries.
    pub topic: String,

    /// Encoding of raw record values.
    pub format: InputFormat,

    /// Pending records buffered before a flush.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Reaction to undecodable records.
    #[serde(default)]
    pub on_decode_error: DecodeErrorPolicy,

    /// Column layout.
    pub schema: Schema,
}

fn default_buffer_capacity() -> usize {
    DEFAULT_GROUP_SIZE
}

impl StreamConfig {
    /// Creates a stream configuration with default buffering.
    pub fn new(topic: impl Into<String>, format: InputFormat, schema: Schema) -> Self {
        Self {
            topic: topic.into(),
            format,
            buffer_capacity: DEFAULT_GROUP_SIZE,
            on_decode_error: DecodeErrorPolicy::default(),
            schema,
        }
    }

    /// Overrides the buffer capacity.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Overrides the decode error policy.
    #[must_use]
    pub fn with_decode_error_policy(mut self, policy: DecodeErrorPolicy) -> Self {
        self.on_decode_error = policy;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.is_empty() {
            return Err("stream topic must not be empty".to_string());
        }
        if self.buffer_capacity < MIN_GROUP_SIZE {
            return Err(format!(
                "buffer_capacity of stream '{}' must be at least {MIN_GROUP_SIZE}",
                self.topic
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeName;

    #[test]
    fn test_stream_from_toml() {
        let text = r#"
            topic = "tpch-lineitems"
            format = "psv"
            buffer_capacity = 16
            on_decode_error = "skip"

            [[schema.fields]]
            name = "orderkey"
            type = { name = "long" }
        "#;
        let config: StreamConfig = toml::from_str(text).unwrap();
        assert_eq!(config.topic, "tpch-lineitems");
        assert_eq!(config.format, InputFormat::Psv);
        assert_eq!(config.format.delimiter(), Some(b'|'));
        assert_eq!(config.buffer_capacity, 16);
        assert_eq!(config.on_decode_error, DecodeErrorPolicy::Skip);
        assert_eq!(
            config.schema.field(0).unwrap().data_type().name(),
            TypeName::Long
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let text = r#"
            topic = "t"
            format = "avro"
            [[schema.fields]]
            name = "a"
            type = { name = "int" }
        "#;
        assert!(toml::from_str::<StreamConfig>(text).is_err());
    }

    #[test]
    fn test_validate_capacity() {
        let text = r#"
            topic = "t"
            format = "json"
            buffer_capacity = 0
            [[schema.fields]]
            name = "a"
            type = { name = "int" }
        "#;
        let config: StreamConfig = toml::from_str(text).unwrap();
        assert!(config.validate().is_err());
        assert_eq!(config.on_decode_error, DecodeErrorPolicy::Abort);
    }
}
