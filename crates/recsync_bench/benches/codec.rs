//! Value codec and snapshot benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recsync_codec::{from_cbor, to_cbor, SequenceValue, Value};
use recsync_core::snapshot;
use recsync_testkit::scenarios;

fn row() -> Vec<Value> {
    vec![
        Value::Sequence(SequenceValue::allocated("t_seq_id", 10_042)),
        Value::Text("alice@example.com".into()),
        Value::Integer(30),
        Value::Bool(true),
        Value::Bytes(vec![0u8; 64]),
        Value::Null,
    ]
}

fn bench_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("value");
    let value = row();
    let bytes = to_cbor(&value).unwrap();

    group.bench_function("encode_row", |b| {
        b.iter(|| black_box(to_cbor(black_box(&value)).unwrap()));
    });
    group.bench_function("decode_row", |b| {
        b.iter(|| black_box(from_cbor::<Vec<Value>>(black_box(&bytes)).unwrap()));
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    for count in [100i64, 1_000] {
        let (_, collection, ty) = scenarios::populated_t_a(count);
        let bytes = snapshot::capture(&collection).unwrap();
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("capture", count), &collection, |b, c| {
            b.iter(|| black_box(snapshot::capture(black_box(c)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("restore", count), &bytes, |b, bytes| {
            b.iter(|| black_box(snapshot::restore(&ty, black_box(bytes)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_values, bench_snapshot);
criterion_main!(benches);
