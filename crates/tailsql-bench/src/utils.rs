//! Benchmark utilities and helpers.

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tailsql_common::config::{InputFormat, StreamConfig};
use tailsql_common::{Field, Schema, Type, TypeName};

/// Names drawn for generated events.
pub const NAMES: [&str; 8] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel",
];

/// `events(id int, name utf8, amount double)`.
pub fn events_schema() -> Schema {
    let scalar = |name| Type::scalar(name).expect("scalar type name");
    Schema::try_new(vec![
        Field::new("id", scalar(TypeName::Int), false),
        Field::new("name", scalar(TypeName::Utf8), false),
        Field::new("amount", scalar(TypeName::Double), false),
    ])
    .expect("valid schema")
}

/// Stream config for `events` in `format`.
pub fn events_stream(format: InputFormat, capacity: usize) -> StreamConfig {
    StreamConfig::new("events", format, events_schema()).with_buffer_capacity(capacity)
}

/// Generates encoded `events` records with a fixed seed.
pub fn generate_events(count: usize, format: InputFormat) -> Vec<Bytes> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|id| {
            let name = NAMES[rng.gen_range(0..NAMES.len())];
            let amount: f64 = rng.gen_range(0.0..1000.0);
            let value = match format {
                InputFormat::Json => {
                    format!(r#"{{"id":{id},"name":"{name}","amount":{amount:.2}}}"#)
                }
                InputFormat::Csv => format!("{id},{name},{amount:.2}"),
                InputFormat::Psv => format!("{id}|{name}|{amount:.2}"),
            };
            Bytes::from(value)
        })
        .collect()
}
