//! Result serialization.
//!
//! Batches leave the service as one JSON object per row, newline
//! delimited. Null values are omitted from their row object.

use std::io::Write;

use arrow::error::ArrowError;
use arrow::json::LineDelimitedWriter;
use arrow::record_batch::RecordBatch;
use serde_json::{Map, Value};
use thiserror::Error;

use tailsql_sql::executor::{ExecutionError, ResultIterator};

/// Errors raised while serializing results.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Pulling the next batch failed.
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Writing a batch failed.
    #[error("serialization error: {0}")]
    Arrow(#[from] ArrowError),

    /// The serialized rows could not be read back.
    #[error("invalid row: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes `batches` as newline-delimited JSON rows.
pub fn write_batches<W: Write>(out: W, batches: &[RecordBatch]) -> Result<(), OutputError> {
    let mut writer = LineDelimitedWriter::new(out);
    for batch in batches {
        writer.write(batch)?;
    }
    writer.finish()?;
    Ok(())
}

/// Drains `results` into `out` as newline-delimited JSON rows.
///
/// Returns the number of rows written.
pub fn write_json_rows<W: Write>(out: W, mut results: ResultIterator) -> Result<usize, OutputError> {
    let mut writer = LineDelimitedWriter::new(out);
    let mut rows = 0;
    while results.next()? {
        if let Some(batch) = results.value() {
            writer.write(batch)?;
            rows += batch.num_rows();
        }
    }
    writer.finish()?;
    Ok(rows)
}

/// Converts `batches` into JSON row objects.
pub fn json_rows(batches: &[RecordBatch]) -> Result<Vec<Map<String, Value>>, OutputError> {
    let mut buf = Vec::new();
    write_batches(&mut buf, batches)?;
    buf.split(|&b| b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| Ok(serde_json::from_slice(line)?))
        .collect()
}
