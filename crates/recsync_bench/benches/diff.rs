//! Diff engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recsync_core::{diff, IdentityKey, RecordCollection};
use recsync_testkit::{t_a_record, t_a_type};

fn collection(count: i64) -> RecordCollection {
    let ty = t_a_type();
    let mut c = RecordCollection::new(&ty);
    for i in 0..count {
        c.upsert(t_a_record(&ty, i / 100, i % 100, i, i + 1, i + 2))
            .unwrap();
    }
    c
}

/// Every tenth record changed, every twentieth removed, a tenth more added.
fn mutated(past: &RecordCollection) -> RecordCollection {
    let ty = past.item_type().clone();
    let count = past.len() as i64;
    let mut current = past.clone();
    for i in (0..count).step_by(10) {
        let key = IdentityKey::from_iter([i / 100, i % 100]);
        if let Some(record) = current.get_mut(&key) {
            record.set("c", -i).unwrap();
        }
    }
    for i in (5..count).step_by(20) {
        current
            .remove(&IdentityKey::from_iter([i / 100, i % 100]))
            .unwrap();
    }
    for i in count..count + count / 10 {
        current
            .upsert(t_a_record(&ty, i / 100, i % 100, i, i, i))
            .unwrap();
    }
    current
}

fn bench_diff_identical(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_identical");

    for count in [100i64, 1_000, 10_000] {
        let past = collection(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &past, |b, past| {
            b.iter(|| black_box(diff(black_box(past), black_box(past)).unwrap()));
        });
    }

    group.finish();
}

fn bench_diff_mutated(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_mutated");

    for count in [100i64, 1_000, 10_000] {
        let past = collection(count);
        let current = mutated(&past);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &(past, current),
            |b, (past, current)| {
                b.iter(|| black_box(diff(black_box(current), black_box(past)).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_diff_identical, bench_diff_mutated);
criterion_main!(benches);
