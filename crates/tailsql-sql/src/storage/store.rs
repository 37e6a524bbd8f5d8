//! Columnar store with a fixed-capacity pending buffer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info};

use tailsql_common::config::{InputFormat, StreamConfig};
use tailsql_common::memory::{MemoryReservation, MemoryTracker};
use tailsql_common::DEFAULT_GROUP_SIZE;

use super::{BatchIterator, RecordDecoder, StoreError, StoreResult};
use crate::physical::PhysicalExpr;

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Raw record encoding.
    pub format: InputFormat,
    /// Pending records buffered before a flush; also the row count of every
    /// materialized batch.
    pub capacity: usize,
}

impl StoreConfig {
    /// Creates a store configuration.
    pub fn new(format: InputFormat, capacity: usize) -> Self {
        Self { format, capacity }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(InputFormat::Json, DEFAULT_GROUP_SIZE)
    }
}

impl From<&StreamConfig> for StoreConfig {
    fn from(config: &StreamConfig) -> Self {
        Self::new(config.format, config.buffer_capacity)
    }
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug)]
struct PendingRecord {
    offset: i64,
    key: Bytes,
    value: Bytes,
}

#[derive(Debug)]
struct MaterializedBatch {
    batch: RecordBatch,
    /// Key and offset of every row, in row order.
    keys: Vec<(Bytes, i64)>,
    reservation: MemoryReservation,
}

#[derive(Debug, Clone, Copy)]
struct KeyEntry {
    offset: i64,
    /// Row position across all accepted records.
    position: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    pending: Vec<PendingRecord>,
    /// Append-only; entries are never mutated once pushed.
    batches: Vec<MaterializedBatch>,
    keys: HashMap<Bytes, KeyEntry>,
    /// Accepted records: `batches.len() * capacity + pending.len()`.
    rows: u64,
}

impl StoreState {
    fn index(&mut self, key: Bytes, offset: i64) {
        let position = self.rows;
        self.rows += 1;
        if !key.is_empty() {
            self.keys.insert(key, KeyEntry { offset, position });
        }
    }

    /// Latest materialized row holding `key`.
    fn materialized_entry(&self, key: &[u8], capacity: usize) -> Option<KeyEntry> {
        self.batches.iter().enumerate().rev().find_map(|(index, batch)| {
            let row = batch.keys.iter().rposition(|(k, _)| k.as_ref() == key)?;
            Some(KeyEntry {
                offset: batch.keys[row].1,
                position: (index * capacity + row) as u64,
            })
        })
    }
}

/// Point-in-time store statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Records waiting in the pending buffer.
    pub pending_rows: usize,
    /// Materialized batches.
    pub batches: usize,
    /// Rows across materialized batches.
    pub materialized_rows: usize,
    /// Indexed keys.
    pub keys: usize,
    /// Arrow memory held by materialized batches.
    pub reserved_bytes: usize,
}

// =============================================================================
// ColumnarStore
// =============================================================================

/// Buffered columnar store for one relation.
///
/// Readers may create iterators and look up keys at any time. Mutation is
/// only possible through the single [`StoreWriter`] returned at
/// construction.
pub struct ColumnarStore {
    relation: String,
    schema: SchemaRef,
    capacity: usize,
    decoder: RecordDecoder,
    memory: Arc<MemoryTracker>,
    state: RwLock<StoreState>,
}

impl ColumnarStore {
    /// Creates a store and its writer.
    pub fn try_new(
        relation: impl Into<String>,
        schema: SchemaRef,
        config: StoreConfig,
        memory: Arc<MemoryTracker>,
    ) -> StoreResult<(Arc<Self>, StoreWriter)> {
        let relation = relation.into();
        if config.capacity == 0 {
            return Err(StoreError::InvalidConfig(format!(
                "capacity of relation '{relation}' must be positive"
            )));
        }
        let decoder = RecordDecoder::try_new(relation.clone(), schema.clone(), config.format)?;
        let store = Arc::new(Self {
            relation,
            schema,
            capacity: config.capacity,
            decoder,
            memory,
            state: RwLock::new(StoreState {
                pending: Vec::with_capacity(config.capacity),
                ..Default::default()
            }),
        });
        let writer = StoreWriter {
            store: Arc::clone(&store),
        };
        Ok((store, writer))
    }

    /// Relation name.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Schema of every batch produced by this store.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Pending buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a lazy iterator over the store's batches.
    ///
    /// The pending buffer is decoded on the first `next()` and yielded
    /// first; materialized batches follow, newest first. Batches flushed
    /// after the first `next()` are not visited. With `predicate`, batches
    /// are compacted to matching rows and empty results are skipped.
    pub fn iterator(self: &Arc<Self>, predicate: Option<PhysicalExpr>) -> BatchIterator {
        BatchIterator::new(Arc::clone(self), predicate)
    }

    /// Returns the latest value stored for `key` as a one-row batch.
    pub fn get(&self, key: &[u8]) -> StoreResult<RecordBatch> {
        let not_found = || StoreError::KeyNotFound(String::from_utf8_lossy(key).into_owned());

        let state = self.state.read();
        let entry = *state.keys.get(key).ok_or_else(not_found)?;
        let batch_index = (entry.position / self.capacity as u64) as usize;
        let row = (entry.position % self.capacity as u64) as usize;

        if let Some(materialized) = state.batches.get(batch_index) {
            return Ok(materialized.batch.slice(row, 1));
        }
        let value = state
            .pending
            .get(row)
            .map(|r| r.value.clone())
            .ok_or_else(not_found)?;
        drop(state);

        debug!(relation = %self.relation, offset = entry.offset, "decoding pending record for key lookup");
        self.decoder.decode(&[value])
    }

    /// Returns current statistics.
    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            pending_rows: state.pending.len(),
            batches: state.batches.len(),
            materialized_rows: state.batches.iter().map(|b| b.batch.num_rows()).sum(),
            keys: state.keys.len(),
            reserved_bytes: state.batches.iter().map(|b| b.reservation.size()).sum(),
        }
    }

    /// Pending values and the number of materialized batches, read together.
    pub(super) fn snapshot(&self) -> (Vec<Bytes>, usize) {
        let state = self.state.read();
        let pending = state.pending.iter().map(|r| r.value.clone()).collect();
        (pending, state.batches.len())
    }

    /// Materialized batch at `index`, in append order.
    pub(super) fn batch_at(&self, index: usize) -> Option<RecordBatch> {
        self.state.read().batches.get(index).map(|b| b.batch.clone())
    }

    pub(super) fn decoder(&self) -> &RecordDecoder {
        &self.decoder
    }

    pub(super) fn memory(&self) -> &Arc<MemoryTracker> {
        &self.memory
    }

    fn put(&self, offset: i64, key: Bytes, value: Bytes) -> StoreResult<()> {
        let values = {
            let mut state = self.state.write();
            if state.pending.len() + 1 < self.capacity {
                state.pending.push(PendingRecord {
                    offset,
                    key: key.clone(),
                    value,
                });
                state.index(key, offset);
                return Ok(());
            }
            let mut values: Vec<Bytes> = state.pending.iter().map(|r| r.value.clone()).collect();
            values.push(value.clone());
            values
        };

        // Decoding runs without the lock; only the writer touches `pending`.
        let batch = self.decoder.decode(&values)?;
        let reservation = self.memory.try_reserve(batch.get_array_memory_size())?;

        let mut state = self.state.write();
        state.pending.push(PendingRecord {
            offset,
            key: key.clone(),
            value,
        });
        state.index(key, offset);
        let keys = state.pending.drain(..).map(|r| (r.key, r.offset)).collect();
        let rows = batch.num_rows();
        let bytes = reservation.size();
        state.batches.push(MaterializedBatch {
            batch,
            keys,
            reservation,
        });
        info!(
            relation = %self.relation,
            rows,
            bytes,
            batches = state.batches.len(),
            "flushed pending buffer"
        );
        Ok(())
    }

    fn evict_undecodable(&self) -> usize {
        let mut state = self.state.write();
        let base = state.rows - state.pending.len() as u64;
        let pending = std::mem::take(&mut state.pending);
        let before = pending.len();

        let kept: Vec<PendingRecord> = pending
            .into_iter()
            .filter(|r| self.decoder.decode(std::slice::from_ref(&r.value)).is_ok())
            .collect();
        let evicted = before - kept.len();
        if evicted == 0 {
            state.pending = kept;
            return 0;
        }

        // Pending positions shift. Keys indexed into the pending buffer fall
        // back to their latest materialized row, then the survivors are
        // re-indexed at their new positions.
        let displaced: Vec<Bytes> = state
            .keys
            .iter()
            .filter(|(_, entry)| entry.position >= base)
            .map(|(key, _)| key.clone())
            .collect();
        for key in displaced {
            match state.materialized_entry(&key, self.capacity) {
                Some(entry) => {
                    state.keys.insert(key, entry);
                }
                None => {
                    state.keys.remove(&key);
                }
            }
        }
        state.rows = base;
        for record in &kept {
            state.index(record.key.clone(), record.offset);
        }
        state.pending = kept;
        evicted
    }
}

impl fmt::Debug for ColumnarStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnarStore")
            .field("relation", &self.relation)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// StoreWriter
// =============================================================================

/// Exclusive write handle of a [`ColumnarStore`].
///
/// Not `Clone`: a store has exactly one writer for its whole lifetime.
#[derive(Debug)]
pub struct StoreWriter {
    store: Arc<ColumnarStore>,
}

impl StoreWriter {
    /// Appends one raw record.
    ///
    /// When the record fills the pending buffer, the buffer is decoded into
    /// one batch and cleared. If decoding fails, the record is not appended
    /// and the store is left exactly as it was before the call.
    pub fn put(&mut self, offset: i64, key: Bytes, value: Bytes) -> StoreResult<()> {
        self.store.put(offset, key, value)
    }

    /// Removes pending records that fail to decode on their own.
    ///
    /// Returns the number of records removed.
    pub fn evict_undecodable(&mut self) -> usize {
        self.store.evict_undecodable()
    }

    /// The store written by this handle.
    pub fn store(&self) -> &Arc<ColumnarStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    fn test_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("amount", DataType::Float64, false),
        ]))
    }

    fn test_store(capacity: usize) -> (Arc<ColumnarStore>, StoreWriter) {
        ColumnarStore::try_new(
            "events",
            test_schema(),
            StoreConfig::new(InputFormat::Json, capacity),
            MemoryTracker::unbounded(),
        )
        .unwrap()
    }

    fn record(name: &str, amount: f64) -> Bytes {
        Bytes::from(format!(r#"{{"name":"{name}","amount":{amount:?}}}"#))
    }

    fn amount(batch: &RecordBatch, row: usize) -> f64 {
        batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap()
            .value(row)
    }

    #[test]
    fn test_flush_at_capacity() {
        let (store, mut writer) = test_store(3);
        for i in 0..2 {
            writer.put(i, Bytes::new(), record("x", i as f64)).unwrap();
        }
        assert_eq!(store.stats().pending_rows, 2);
        assert_eq!(store.stats().batches, 0);

        writer.put(2, Bytes::new(), record("x", 2.0)).unwrap();
        let stats = store.stats();
        assert_eq!(stats.pending_rows, 0);
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.materialized_rows, 3);
        assert!(stats.reserved_bytes > 0);
        assert_eq!(store.batch_at(0).unwrap().num_rows(), 3);
    }

    #[test]
    fn test_every_batch_has_capacity_rows() {
        let (store, mut writer) = test_store(4);
        for i in 0..10 {
            writer.put(i, Bytes::new(), record("x", i as f64)).unwrap();
        }
        let stats = store.stats();
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.pending_rows, 2);
        for i in 0..stats.batches {
            assert_eq!(store.batch_at(i).unwrap().num_rows(), 4);
        }
    }

    #[test]
    fn test_decode_failure_rolls_back() {
        let (store, mut writer) = test_store(2);
        writer.put(0, Bytes::from_static(b"k0"), record("x", 1.0)).unwrap();

        let err = writer
            .put(1, Bytes::from_static(b"k1"), Bytes::from_static(b"{not json"))
            .unwrap_err();
        assert!(err.is_decode());
        let stats = store.stats();
        assert_eq!(stats.pending_rows, 1);
        assert_eq!(stats.batches, 0);
        assert_eq!(stats.keys, 1);
        assert!(matches!(store.get(b"k1"), Err(StoreError::KeyNotFound(_))));

        writer.put(1, Bytes::from_static(b"k1"), record("y", 2.0)).unwrap();
        assert_eq!(store.stats().batches, 1);
        assert_eq!(amount(&store.get(b"k1").unwrap(), 0), 2.0);
    }

    #[test]
    fn test_get_latest_value() {
        let (store, mut writer) = test_store(2);
        writer.put(0, Bytes::from_static(b"a"), record("x", 1.0)).unwrap();
        writer.put(1, Bytes::from_static(b"b"), record("y", 2.0)).unwrap();
        writer.put(2, Bytes::from_static(b"a"), record("x", 3.0)).unwrap();

        // "b" lives in a materialized batch, "a" in the pending buffer.
        let b = store.get(b"b").unwrap();
        assert_eq!(b.num_rows(), 1);
        assert_eq!(amount(&b, 0), 2.0);

        let a = store.get(b"a").unwrap();
        assert_eq!(a.num_rows(), 1);
        assert_eq!(amount(&a, 0), 3.0);
        let names = a.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(names.value(0), "x");

        assert!(matches!(store.get(b"zzz"), Err(StoreError::KeyNotFound(k)) if k == "zzz"));
    }

    #[test]
    fn test_empty_keys_not_indexed() {
        let (store, mut writer) = test_store(8);
        writer.put(0, Bytes::new(), record("x", 1.0)).unwrap();
        assert_eq!(store.stats().keys, 0);
        assert!(store.get(b"").is_err());
    }

    #[test]
    fn test_evict_undecodable() {
        let (store, mut writer) = test_store(3);
        writer.put(0, Bytes::from_static(b"a"), record("x", 1.0)).unwrap();
        writer.put(1, Bytes::from_static(b"bad"), Bytes::from_static(b"{oops")).unwrap();
        assert!(writer.put(2, Bytes::from_static(b"c"), record("z", 3.0)).is_err());

        assert_eq!(writer.evict_undecodable(), 1);
        assert_eq!(store.stats().pending_rows, 1);
        assert!(store.get(b"bad").is_err());

        writer.put(2, Bytes::from_static(b"c"), record("z", 3.0)).unwrap();
        writer.put(3, Bytes::from_static(b"d"), record("w", 4.0)).unwrap();
        assert_eq!(store.stats().batches, 1);
        assert_eq!(amount(&store.get(b"a").unwrap(), 0), 1.0);
        assert_eq!(amount(&store.get(b"c").unwrap(), 0), 3.0);
        assert_eq!(amount(&store.get(b"d").unwrap(), 0), 4.0);
        assert_eq!(writer.evict_undecodable(), 0);
    }

    #[test]
    fn test_evict_restores_materialized_key() {
        let (store, mut writer) = test_store(2);
        writer.put(0, Bytes::from_static(b"a"), record("x", 1.0)).unwrap();
        writer.put(1, Bytes::from_static(b"b"), record("y", 2.0)).unwrap();
        writer.put(2, Bytes::from_static(b"a"), Bytes::from_static(b"{bad")).unwrap();

        assert_eq!(writer.evict_undecodable(), 1);
        let a = store.get(b"a").unwrap();
        assert_eq!(amount(&a, 0), 1.0);
        assert_eq!(store.stats().keys, 2);

        // The next record lands in the freed pending slot.
        writer.put(2, Bytes::from_static(b"c"), record("z", 3.0)).unwrap();
        writer.put(3, Bytes::from_static(b"a"), record("x", 4.0)).unwrap();
        assert_eq!(store.stats().batches, 2);
        assert_eq!(amount(&store.get(b"a").unwrap(), 0), 4.0);
        assert_eq!(amount(&store.get(b"b").unwrap(), 0), 2.0);
    }

    #[test]
    fn test_memory_limit() {
        let (_store, mut writer) = ColumnarStore::try_new(
            "events",
            test_schema(),
            StoreConfig::new(InputFormat::Json, 1),
            MemoryTracker::with_limit(1),
        )
        .unwrap();
        let err = writer.put(0, Bytes::new(), record("x", 1.0)).unwrap_err();
        assert!(matches!(err, StoreError::Memory(_)));
        assert_eq!(writer.store().stats().pending_rows, 0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ColumnarStore::try_new(
            "events",
            test_schema(),
            StoreConfig::new(InputFormat::Json, 0),
            MemoryTracker::unbounded(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }
}
