//! Merge executor benchmarks against the memory store.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use recsync_core::{merge, MergeOptions, RecordCollection};
use recsync_testkit::{scenarios, sequence_record, sequence_type, t_a_record, TestStore};

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_insert");
    let ty = sequence_type();

    for count in [100usize, 1_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter_batched(
                || {
                    let mut current = RecordCollection::new(&ty);
                    for i in 0..count {
                        current
                            .upsert(sequence_record(&ty, &format!("r{i}")))
                            .unwrap();
                    }
                    (TestStore::for_types(&[&ty]), current)
                },
                |(mut store, mut current)| {
                    merge(
                        &mut store.store,
                        &mut current,
                        &RecordCollection::new(&ty),
                        MergeOptions::default(),
                    )
                    .unwrap()
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_update_batching(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_update");

    for (label, batch_updates) in [("batched", true), ("per_row", false)] {
        group.bench_function(label, |b| {
            b.iter_batched(
                || {
                    let (store, past, ty) = scenarios::populated_t_a(500);
                    let mut current = past.clone();
                    let keys: Vec<_> = current.keys().cloned().collect();
                    for (i, key) in keys.iter().enumerate() {
                        let attribute = if i % 2 == 0 { "c" } else { "d" };
                        current
                            .get_mut(key)
                            .unwrap()
                            .set(attribute, -(i as i64))
                            .unwrap();
                    }
                    current.upsert(t_a_record(&ty, 2, 0, 0, 0, 0)).unwrap();
                    (store, past, current)
                },
                |(mut store, past, mut current)| {
                    let options = MergeOptions::new().batch_updates(batch_updates);
                    merge(&mut store.store, &mut current, &past, options).unwrap()
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_update_batching);
criterion_main!(benches);
