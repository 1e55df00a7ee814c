//! Key codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use strata_sql::codec::{decode_row_payload, encode_id, encode_row_payload, encode_value};
use strata_sql::value::{SqlType, Value};

fn bench_encode_id(c: &mut Criterion) {
    c.bench_function("encode_id", |b| {
        b.iter(|| encode_id(black_box(0x1234_5678_9abc_def0)));
    });
}

fn bench_encode_value(c: &mut Criterion) {
    let number = Value::Number(42);
    let text = Value::Str("a moderately sized string value".into());

    c.bench_function("encode_integer_key", |b| {
        b.iter(|| encode_value(black_box(&number), SqlType::Integer, true).unwrap());
    });
    c.bench_function("encode_string_key", |b| {
        b.iter(|| encode_value(black_box(&text), SqlType::Varchar, true).unwrap());
    });
}

fn bench_row_payload(c: &mut Criterion) {
    let id = Value::Number(7);
    let name = Value::Str("alice".into());
    let active = Value::Bool(true);
    let cols = [
        ("id", &id, SqlType::Integer),
        ("name", &name, SqlType::Varchar),
        ("active", &active, SqlType::Boolean),
    ];
    let payload = encode_row_payload(&cols).unwrap();

    c.bench_function("encode_row_payload", |b| {
        b.iter(|| encode_row_payload(black_box(&cols)).unwrap());
    });
    c.bench_function("decode_row_payload", |b| {
        b.iter(|| {
            decode_row_payload(black_box(&payload), |col| match col {
                "id" => Some(SqlType::Integer),
                "name" => Some(SqlType::Varchar),
                "active" => Some(SqlType::Boolean),
                _ => None,
            })
            .unwrap()
        });
    });
}

criterion_group!(benches, bench_encode_id, bench_encode_value, bench_row_payload);
criterion_main!(benches);
