//! Shared test fixtures.

use bytes::Bytes;
use serde_json::{Map, Value};

use tailsql_common::config::{InputFormat, StreamConfig};
use tailsql_common::{Field, Schema, Type, TypeName};
use tailsql_server::database::{Datastore, DatastoreConfig, DatastoreResult};
use tailsql_server::output::json_rows;
use tailsql_sql::storage::StoreWriter;

/// `events(name utf8, amount double)`.
pub fn events_schema() -> Schema {
    let scalar = |name| Type::scalar(name).expect("scalar type name");
    Schema::try_new(vec![
        Field::new("name", scalar(TypeName::Utf8), false),
        Field::new("amount", scalar(TypeName::Double), false),
    ])
    .expect("valid schema")
}

/// JSON stream for the `events` relation with the given buffer capacity.
pub fn events_stream(capacity: usize) -> StreamConfig {
    StreamConfig::new("events", InputFormat::Json, events_schema()).with_buffer_capacity(capacity)
}

/// Encodes one `events` record.
pub fn event(name: &str, amount: f64) -> Bytes {
    Bytes::from(format!(r#"{{"name":"{name}","amount":{amount:?}}}"#))
}

/// Datastore with `events` registered, plus its writer.
pub fn events_datastore(capacity: usize) -> (Datastore, StoreWriter) {
    let datastore = Datastore::new(DatastoreConfig::default());
    let writer = datastore
        .register(&events_stream(capacity))
        .expect("register events");
    (datastore, writer)
}

/// Appends `(name, amount)` records with consecutive offsets and no keys.
pub fn put_events(writer: &mut StoreWriter, events: &[(&str, f64)]) {
    for (offset, (name, amount)) in events.iter().enumerate() {
        writer
            .put(offset as i64, Bytes::new(), event(name, *amount))
            .expect("put event");
    }
}

/// Runs `sql` against `relation` and returns every result row as JSON.
pub fn query_rows(
    datastore: &Datastore,
    relation: &str,
    sql: &str,
) -> DatastoreResult<Vec<Map<String, Value>>> {
    let batches = datastore.query(relation, sql)?.collect_batches()?;
    Ok(json_rows(&batches).expect("serialize rows"))
}

/// Extracts a float column from JSON rows.
pub fn column_f64(rows: &[Map<String, Value>], column: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.get(column).and_then(Value::as_f64))
        .collect()
}
