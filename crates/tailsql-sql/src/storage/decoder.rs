//! Raw record decoding.

use std::io::Cursor;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder as CsvReaderBuilder;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::error::ArrowError;
use arrow::json::ReaderBuilder as JsonReaderBuilder;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;

use tailsql_common::config::InputFormat;
use tailsql_common::DEFAULT_BATCH_SIZE;

use super::{StoreError, StoreResult};

/// Decodes raw record values into one arrow batch.
///
/// Decoding is all or nothing: either every value becomes exactly one row,
/// or the call fails and no batch is produced.
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    relation: String,
    schema: SchemaRef,
    format: InputFormat,
}

impl RecordDecoder {
    /// Creates a decoder, rejecting columns the format cannot express.
    pub fn try_new(
        relation: impl Into<String>,
        schema: SchemaRef,
        format: InputFormat,
    ) -> StoreResult<Self> {
        if format.delimiter().is_some() {
            for field in schema.fields() {
                if !is_delimited_type(field.data_type()) {
                    return Err(StoreError::UnsupportedType {
                        field: field.name().clone(),
                        data_type: field.data_type().clone(),
                        format,
                    });
                }
            }
        }
        Ok(Self {
            relation: relation.into(),
            schema,
            format,
        })
    }

    /// Output schema.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Decodes `values` into a batch of exactly `values.len()` rows.
    pub fn decode(&self, values: &[Bytes]) -> StoreResult<RecordBatch> {
        if values.is_empty() {
            return Ok(RecordBatch::new_empty(self.schema.clone()));
        }
        let batch = match self.format.delimiter() {
            None => self.decode_json(values),
            Some(delimiter) => self.decode_delimited(values, delimiter),
        }
        .map_err(|e| self.error(e.to_string()))?;

        if batch.num_rows() != values.len() {
            return Err(self.error(format!(
                "expected {} rows, decoded {}",
                values.len(),
                batch.num_rows()
            )));
        }
        Ok(batch)
    }

    fn decode_json(&self, values: &[Bytes]) -> Result<RecordBatch, ArrowError> {
        let mut decoder = JsonReaderBuilder::new(self.schema.clone())
            .with_batch_size(values.len())
            .build_decoder()?;
        for (index, value) in values.iter().enumerate() {
            let buffered = decoder.len();
            let mut buf: &[u8] = value;
            while !buf.is_empty() {
                let read = decoder.decode(buf)?;
                if read == 0 {
                    return Err(ArrowError::JsonError(
                        "record contains more values than expected".to_string(),
                    ));
                }
                buf = &buf[read..];
            }
            decoder.decode(b"\n")?;
            let rows = decoder.len() - buffered;
            if rows != 1 || decoder.has_partial_record() {
                return Err(ArrowError::JsonError(format!(
                    "record {index} holds {rows} complete values, expected exactly one"
                )));
            }
        }
        Ok(decoder
            .flush()?
            .unwrap_or_else(|| RecordBatch::new_empty(self.schema.clone())))
    }

    fn decode_delimited(&self, values: &[Bytes], delimiter: u8) -> Result<RecordBatch, ArrowError> {
        let total: usize = values.iter().map(|v| v.len() + 1).sum();
        let mut joined = Vec::with_capacity(total);
        for (index, value) in values.iter().enumerate() {
            let line = strip_terminator(value);
            if has_unquoted_terminator(line) {
                return Err(ArrowError::CsvError(format!(
                    "record {index} spans more than one line"
                )));
            }
            joined.extend_from_slice(line);
            joined.push(b'\n');
        }

        let reader = CsvReaderBuilder::new(self.schema.clone())
            .with_header(false)
            .with_delimiter(delimiter)
            .with_batch_size(values.len().min(DEFAULT_BATCH_SIZE))
            .build(Cursor::new(joined))?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        concat_batches(&self.schema, &batches)
    }

    fn error(&self, reason: String) -> StoreError {
        StoreError::Decode {
            relation: self.relation.clone(),
            reason,
        }
    }
}

fn strip_terminator(value: &[u8]) -> &[u8] {
    let value = value.strip_suffix(b"\n").unwrap_or(value);
    value.strip_suffix(b"\r").unwrap_or(value)
}

/// Whether a line break occurs outside a double-quoted field.
fn has_unquoted_terminator(line: &[u8]) -> bool {
    let mut quoted = false;
    for &byte in line {
        match byte {
            b'"' => quoted = !quoted,
            b'\n' | b'\r' if !quoted => return true,
            _ => {}
        }
    }
    false
}

fn is_delimited_type(data_type: &DataType) -> bool {
    data_type.is_primitive() || matches!(data_type, DataType::Boolean | DataType::Utf8)
}
