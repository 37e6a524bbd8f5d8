//! System-wide constants for TailSQL.

// =============================================================================
// Store Constants
// =============================================================================

/// Default number of pending records buffered before a flush.
///
/// Every materialized batch of a store holds exactly this many rows unless
/// the stream overrides its buffer capacity.
pub const DEFAULT_GROUP_SIZE: usize = 4096;

/// Smallest accepted buffer capacity for a stream.
pub const MIN_GROUP_SIZE: usize = 1;

/// Delimiter used by the `csv` input format.
pub const CSV_DELIMITER: u8 = b',';

/// Delimiter used by the `psv` input format.
pub const PSV_DELIMITER: u8 = b'|';

// =============================================================================
// Ingestion Constants
// =============================================================================

/// Default capacity of the bounded queue between a producer and its
/// ingestion worker.
pub const DEFAULT_INGEST_QUEUE_CAPACITY: usize = 1024;

// =============================================================================
// Query Constants
// =============================================================================

/// Default number of rows per batch produced by the delimited decoders.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Maximum accepted SQL text length in bytes.
pub const MAX_QUERY_LENGTH: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_size_bounds() {
        assert!(DEFAULT_GROUP_SIZE >= MIN_GROUP_SIZE);
        assert!(DEFAULT_BATCH_SIZE >= DEFAULT_GROUP_SIZE);
    }

    #[test]
    fn test_delimiters_differ() {
        assert_ne!(CSV_DELIMITER, PSV_DELIMITER);
    }
}
